//! The consultation server's REST surface.
//!
//! DESIGN
//! ======
//! `ConsultationApi` is the seam between the controller and the network.
//! `HttpApi` implements it over reqwest; controller tests substitute a
//! scripted fake.

pub mod http;
pub mod types;

use async_trait::async_trait;

use crate::session::profile::PatientProfile;
use types::{
    ApiError, AssistantReply, DiagnosisResponse, ReportOutcome, SaveRecordRequest, SaveRecordResponse, StartSessionResponse, TreatmentRequest,
    TreatmentResponse,
};

pub use http::HttpApi;

#[async_trait]
pub trait ConsultationApi: Send + Sync {
    /// `POST /start_session` with the patient profile.
    async fn start_session(&self, profile: &PatientProfile) -> Result<StartSessionResponse, ApiError>;

    /// `POST /chat` with `{message, session_id}`.
    async fn chat(&self, session_id: &str, message: &str) -> Result<AssistantReply, ApiError>;

    /// `POST /generate_report` with `{session_id}`. Non-2xx is an error
    /// before the body is looked at.
    async fn generate_report(&self, session_id: &str) -> Result<ReportOutcome, ApiError>;

    /// Fetch a server-hosted report. `report_url` may be relative to the API origin.
    async fn fetch_report(&self, report_url: &str) -> Result<Vec<u8>, ApiError>;

    /// `POST /diagnosis` with `{symptoms, patient_data}`.
    async fn check_symptoms(&self, symptoms: &[String], profile: &PatientProfile) -> Result<DiagnosisResponse, ApiError>;

    /// `POST /treatment` with `{diagnosis: {primary_diagnosis, symptoms}, patient_data}`.
    async fn treatment_plan(&self, request: &TreatmentRequest<'_>) -> Result<TreatmentResponse, ApiError>;

    /// `POST /save_patient_record`.
    async fn save_record(&self, record: &SaveRecordRequest<'_>) -> Result<SaveRecordResponse, ApiError>;
}
