//! reqwest-backed implementation of [`ConsultationApi`].

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::ConsultationApi;
use super::types::{
    ApiError, AssistantReply, ChatRequest, DiagnosisRequest, DiagnosisResponse, ReportOutcome, ReportRequest,
    SaveRecordRequest, SaveRecordResponse, StartSessionResponse, TreatmentRequest, TreatmentResponse, parse_chat_response,
    parse_report_response,
};
use crate::config::ClientConfig;
use crate::session::profile::PatientProfile;

pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client for the configured API root.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_base_url.trim_end_matches('/').to_string() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_text(&self, path: &str, body: &(impl Serialize + Sync)) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(ApiError::Status { status, body: text });
        }
        Ok(text)
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &(impl Serialize + Sync)) -> Result<T, ApiError> {
        let text = self.post_text(path, body).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Resolve a server-provided report URL against the API origin, the way a
/// browser resolves a link against the page.
///
/// # Errors
///
/// Returns [`ApiError::InvalidUrl`] if either URL is malformed.
pub fn resolve_report_url(base_url: &str, report_url: &str) -> Result<Url, ApiError> {
    let base = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
    base.join(report_url)
        .map_err(|e| ApiError::InvalidUrl(format!("{report_url}: {e}")))
}

#[async_trait]
impl ConsultationApi for HttpApi {
    async fn start_session(&self, profile: &PatientProfile) -> Result<StartSessionResponse, ApiError> {
        self.post_json("/start_session", profile).await
    }

    async fn chat(&self, session_id: &str, message: &str) -> Result<AssistantReply, ApiError> {
        let text = self
            .post_text("/chat", &ChatRequest { message, session_id })
            .await?;
        parse_chat_response(&text)
    }

    async fn generate_report(&self, session_id: &str) -> Result<ReportOutcome, ApiError> {
        let text = self
            .post_text("/generate_report", &ReportRequest { session_id })
            .await?;
        parse_report_response(&text)
    }

    async fn fetch_report(&self, report_url: &str) -> Result<Vec<u8>, ApiError> {
        let url = resolve_report_url(&self.base_url, report_url)?;
        debug!(%url, "GET report");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn check_symptoms(&self, symptoms: &[String], profile: &PatientProfile) -> Result<DiagnosisResponse, ApiError> {
        self.post_json("/diagnosis", &DiagnosisRequest { symptoms, patient_data: profile })
            .await
    }

    async fn treatment_plan(&self, request: &TreatmentRequest<'_>) -> Result<TreatmentResponse, ApiError> {
        self.post_json("/treatment", request).await
    }

    async fn save_record(&self, record: &SaveRecordRequest<'_>) -> Result<SaveRecordResponse, ApiError> {
        self.post_json("/save_patient_record", record).await
    }
}
