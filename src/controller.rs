//! Consultation controller: intake, chat, insight panels, reports.
//!
//! DESIGN
//! ======
//! A single controller owns the session state, the download manager and the
//! cancellation token. Every user action is a `&mut self` method: validate
//! locally, update the view, call the API raced against cancellation, then
//! restore interactive controls whatever the outcome. API failures never escape
//! as `Err` to the caller; they are surfaced through the view the same way
//! the page surfaced them (blocking alert, assistant entry, toast).

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::api::ConsultationApi;
use crate::api::types::{ApiError, ReportOutcome, SaveRecordRequest, StartSessionResponse, TreatmentDiagnosis, TreatmentRequest};
use crate::cancel::CancelToken;
use crate::download::{DownloadError, DownloadManager, SavedReport, file_name_from_url};
use crate::insight::MedicalInsight;
use crate::session::conversation::Role;
use crate::session::profile::ProfileForm;
use crate::session::{SessionState, ValidationError};
use crate::view::{REPORT_LABEL_BUSY, REPORT_LABEL_IDLE, ToastKind, View};

pub const COMMON_SYMPTOMS: [&str; 12] = [
    "Headache",
    "Fever",
    "Cough",
    "Sore throat",
    "Fatigue",
    "Nausea",
    "Dizziness",
    "Chest pain",
    "Shortness of breath",
    "Back pain",
    "Stomach ache",
    "Runny nose",
];

/// Cosmetic delay of the startup typing indicator.
pub const TYPING_PREVIEW: Duration = Duration::from_millis(1500);

pub const START_FAILED_MESSAGE: &str = "Sorry, I couldn't start the consultation. Please try again.";
pub const WELCOME_FALLBACK: &str = "Hello! How can I help you today?";
pub const CHAT_FAILED_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";
pub const GREETING_MESSAGE: &str = "Chat cleared. How can I help you today?";
pub const CLEAR_PROMPT: &str = "Are you sure you want to clear the chat history?";
pub const REPORT_SAVED_MESSAGE: &str = "Medical report generated successfully";
pub const REPORT_FAILED_MESSAGE: &str = "Error generating report";
pub const EMERGENCY_TOAST: &str = "This may be a medical emergency. Seek immediate care.";
pub const SYMPTOM_CHECK_FAILED_MESSAGE: &str = "Error checking symptoms";
pub const RECORD_SAVE_FAILED_MESSAGE: &str = "Failed to save patient record";
pub const TREATMENT_FAILED_MESSAGE: &str = "Error getting treatment plan";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Server(String),
    #[error(transparent)]
    Download(#[from] DownloadError),
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct ConsultationController<A, V> {
    api: A,
    view: V,
    state: SessionState,
    downloads: DownloadManager,
    cancel: CancelToken,
    typing_preview: Duration,
    /// Symptoms of the last successful check, sent with a treatment request.
    checked_symptoms: Vec<String>,
}

impl<A: ConsultationApi, V: View> ConsultationController<A, V> {
    pub fn new(api: A, view: V, downloads: DownloadManager, cancel: CancelToken) -> Self {
        Self {
            api,
            view,
            state: SessionState::new(),
            downloads,
            cancel,
            typing_preview: TYPING_PREVIEW,
            checked_symptoms: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_typing_preview(mut self, delay: Duration) -> Self {
        self.typing_preview = delay;
        self
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    #[must_use]
    pub fn downloads(&self) -> &DownloadManager {
        &self.downloads
    }

    fn append(&mut self, role: Role, message: impl Into<String>, data: Option<serde_json::Value>) {
        let entry = self.state.conversation_mut().push(role, message, data);
        self.view.append_entry(entry);
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    pub async fn initialize(&mut self) {
        self.view.show_intake_form(self.state.form());
        self.view.set_report_trigger(false, REPORT_LABEL_IDLE);
        self.view.set_typing(true);
        tokio::time::sleep(self.typing_preview).await;
        self.view.set_typing(false);
        self.view.set_suggestions(&COMMON_SYMPTOMS);
    }

    /// Copy a quick suggestion into the draft input.
    pub fn pick_suggestion(&mut self, index: usize) -> Option<&'static str> {
        let label = COMMON_SYMPTOMS.get(index).copied()?;
        self.view.set_draft(label);
        Some(label)
    }

    // =========================================================================
    // INTAKE
    // =========================================================================

    /// Validate the intake form and open a session.
    ///
    /// # Errors
    ///
    /// Returns the validation failure after alerting; nothing is sent.
    pub async fn start_consultation(&mut self, form: ProfileForm) -> Result<(), ValidationError> {
        let profile = match form.validate() {
            Ok(profile) => profile,
            Err(e) => {
                self.view.alert(&e.to_string());
                return Err(e);
            }
        };

        self.view.show_profile_summary(&profile);

        let result = self.cancel.run(self.api.start_session(&profile)).await;
        match result {
            Ok(StartSessionResponse { session_id: Some(session_id), message }) if !session_id.is_empty() => {
                info!(%session_id, patient = %profile.name, "consultation started");
                let first_start = !self.state.is_active();
                self.state.remember_form(form);
                self.state.activate(profile, session_id);
                if first_start {
                    self.view.set_report_trigger(true, REPORT_LABEL_IDLE);
                }
                let welcome = message.filter(|m| !m.is_empty());
                self.append(Role::Assistant, welcome.as_deref().unwrap_or(WELCOME_FALLBACK), None);
            }
            Ok(_) => {
                warn!("start_session response carried no session_id");
                self.start_failed(form);
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "start_session failed");
                self.start_failed(form);
            }
        }
        Ok(())
    }

    /// A failed restart leaves the active session, its profile summary and
    /// its form in place. Without a session the entered form is kept for editing.
    fn start_failed(&mut self, form: ProfileForm) {
        match self.state.profile() {
            Some(active) => self.view.show_profile_summary(active),
            None => self.state.remember_form(form),
        }
        self.append(Role::Assistant, START_FAILED_MESSAGE, None);
    }

    /// Return to the intake form with the last submitted values. The session
    /// stays open.
    pub fn edit_profile(&mut self) {
        self.view.show_intake_form(self.state.form());
    }

    // =========================================================================
    // CHAT
    // =========================================================================

    pub async fn send_message(&mut self, text: &str) {
        let message = text.trim();
        if message.is_empty() {
            return;
        }
        let Some(session_id) = self.state.session_id().map(str::to_owned) else {
            self.view.alert(&ValidationError::NoSession.to_string());
            return;
        };

        self.append(Role::User, message, None);
        self.view.set_draft("");
        self.view.set_typing(true);

        let result = self.cancel.run(self.api.chat(&session_id, message)).await;
        self.view.set_typing(false);

        match result {
            Ok(reply) => {
                debug!(%session_id, kind = ?reply.kind, has_data = reply.data.is_some(), "chat reply");
                self.append(Role::Assistant, reply.message.as_str(), None);
                if reply.is_emergency() {
                    self.view.toast(ToastKind::Warning, EMERGENCY_TOAST);
                }
                if let Some(insight) = &reply.insight {
                    self.render_insight_panels(insight);
                }
                if reply.data.is_some() {
                    // History only; the text was already shown above.
                    self.state.conversation_mut().push(Role::Assistant, reply.message, reply.data);
                }
            }
            Err(e) => {
                warn!(%session_id, error = %e, code = e.error_code(), "chat request failed");
                self.append(Role::Assistant, CHAT_FAILED_MESSAGE, None);
            }
        }
    }

    /// Wipe the transcript after confirmation. Returns whether it was cleared.
    pub fn clear_chat(&mut self) -> bool {
        if !self.view.confirm(CLEAR_PROMPT) {
            return false;
        }
        self.state.conversation_mut().clear();
        self.view.clear_transcript();
        self.append(Role::Assistant, GREETING_MESSAGE, None);
        true
    }

    /// Update each insight panel whose field is present; the rest keep their
    /// previous content.
    pub fn render_insight_panels(&mut self, insight: &MedicalInsight) {
        let update = insight.panel_update();
        if let Some(summary) = &update.diagnosis {
            self.view.render_diagnosis(summary);
        }
        if let Some(cards) = &update.treatments {
            self.view.render_treatments(cards);
        }
        if let Some(cards) = &update.tests {
            self.view.render_tests(cards);
        }
    }

    // =========================================================================
    // REPORT
    // =========================================================================

    pub async fn generate_report(&mut self) {
        let (session_id, patient_name) = match self.state.require_active() {
            Ok((id, profile)) => (id.to_owned(), profile.name.clone()),
            Err(e) => {
                self.view.alert(&e.to_string());
                return;
            }
        };

        self.view.set_report_trigger(false, REPORT_LABEL_BUSY);
        self.view.set_typing(true);

        let result = self.produce_report(&session_id, &patient_name).await;

        self.view.set_report_trigger(true, REPORT_LABEL_IDLE);
        self.view.set_typing(false);

        match result {
            Ok(Some(saved)) => {
                info!(%session_id, inline = saved.blob_url.is_some(), "report generated");
                let message = format!("{REPORT_SAVED_MESSAGE} and saved to {}", saved.path.display());
                self.append(Role::Assistant, message, None);
                self.view.toast(ToastKind::Success, REPORT_SAVED_MESSAGE);
            }
            Ok(None) => {
                warn!(%session_id, "report response had no url, error or pdf");
            }
            Err(e) => {
                warn!(%session_id, error = %e, "report generation failed");
                self.append(Role::Assistant, format!("{REPORT_FAILED_MESSAGE}: {e}"), None);
                self.view.toast(ToastKind::Error, &format!("{REPORT_FAILED_MESSAGE}: {e}"));
            }
        }
    }

    async fn produce_report(&mut self, session_id: &str, patient_name: &str) -> Result<Option<SavedReport>, ReportError> {
        let outcome = self.cancel.run(self.api.generate_report(session_id)).await?;
        match outcome {
            ReportOutcome::Url(url) => {
                let bytes = self.cancel.run(self.api.fetch_report(&url)).await?;
                let saved = self.downloads.save_bytes(&file_name_from_url(&url), &bytes).await?;
                Ok(Some(saved))
            }
            ReportOutcome::ServerError(message) => Err(ReportError::Server(message)),
            ReportOutcome::PdfBase64(encoded) => {
                let today = OffsetDateTime::now_utc().date();
                let saved = self.downloads.save_pdf_base64(patient_name, &encoded, today).await?;
                Ok(Some(saved))
            }
            ReportOutcome::Unhandled => Ok(None),
        }
    }

    // =========================================================================
    // SYMPTOM CHECK
    // =========================================================================

    pub async fn check_symptoms(&mut self, symptoms: &[String]) {
        let symptoms: Vec<String> = symptoms
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if symptoms.is_empty() {
            self.view.alert(&ValidationError::NoSymptoms.to_string());
            return;
        }
        let Some(profile) = self.state.profile().cloned() else {
            self.view.alert(&ValidationError::NoSession.to_string());
            return;
        };

        self.view.set_typing(true);
        let result = self.cancel.run(self.api.check_symptoms(&symptoms, &profile)).await;
        self.view.set_typing(false);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "symptom check failed");
                self.append(Role::Assistant, format!("{SYMPTOM_CHECK_FAILED_MESSAGE}: {e}"), None);
                self.view.toast(ToastKind::Error, SYMPTOM_CHECK_FAILED_MESSAGE);
                return;
            }
        };
        if let Some(message) = response.server_error() {
            let message = format!("{SYMPTOM_CHECK_FAILED_MESSAGE}: {message}");
            self.append(Role::Assistant, message.as_str(), None);
            self.view.toast(ToastKind::Error, &message);
            return;
        }

        info!(count = symptoms.len(), conditions = response.possible_diseases.len(), "symptom check complete");
        let insight = response.to_insight();
        self.render_insight_panels(&insight);
        if let Some(summary) = response.ai_summary.as_deref().filter(|s| !s.is_empty()) {
            let data = serde_json::to_value(&insight).ok();
            self.append(Role::Assistant, summary, data);
        }
        self.checked_symptoms = symptoms;
    }

    // =========================================================================
    // TREATMENT PLAN
    // =========================================================================

    /// Request a treatment plan. A blank `diagnosis` falls back to the most
    /// recent suggested diagnosis in the conversation.
    pub async fn treatment_plan(&mut self, diagnosis: &str) {
        let Some(profile) = self.state.profile().cloned() else {
            self.view.alert(&ValidationError::NoSession.to_string());
            return;
        };
        let diagnosis = match diagnosis.trim() {
            "" => self.latest_diagnosis(),
            named => Some(named.to_owned()),
        };
        let Some(diagnosis) = diagnosis else {
            self.view.alert(&ValidationError::NoDiagnosis.to_string());
            return;
        };

        self.view.set_typing(true);
        let request = TreatmentRequest {
            diagnosis: TreatmentDiagnosis {
                primary_diagnosis: &diagnosis,
                symptoms: &self.checked_symptoms,
            },
            patient_data: &profile,
        };
        let result = self.cancel.run(self.api.treatment_plan(&request)).await;
        self.view.set_typing(false);

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), %diagnosis, "treatment plan request failed");
                self.append(Role::Assistant, format!("{TREATMENT_FAILED_MESSAGE}: {e}"), None);
                self.view.toast(ToastKind::Error, TREATMENT_FAILED_MESSAGE);
                return;
            }
        };
        if let Some(message) = response.server_error() {
            warn!(error = message, %diagnosis, "treatment plan unavailable");
            if let Some(fallback) = response.fallback_insight() {
                self.render_insight_panels(&fallback);
            }
            let message = format!("{TREATMENT_FAILED_MESSAGE}: {message}");
            self.append(Role::Assistant, message.as_str(), None);
            self.view.toast(ToastKind::Error, &message);
            return;
        }
        let Some(plan) = response.treatment_plan else {
            return;
        };

        info!(%diagnosis, "treatment plan received");
        self.render_insight_panels(&plan.to_insight());
        self.append(Role::Assistant, plan.summary(&diagnosis), Some(plan.history_payload(&diagnosis)));
    }

    fn latest_diagnosis(&self) -> Option<String> {
        self.state
            .conversation()
            .latest_insight()
            .and_then(|entry| entry.data.as_ref()?.get("suggested_diagnosis")?.as_str())
            .filter(|label| !label.trim().is_empty())
            .map(str::to_owned)
    }

    // =========================================================================
    // PATIENT RECORD
    // =========================================================================

    pub async fn save_record(&mut self) {
        let result = {
            let (session_id, profile) = match self.state.require_active() {
                Ok(active) => active,
                Err(e) => {
                    self.view.alert(&e.to_string());
                    return;
                }
            };
            let conversation = self.state.conversation();
            let latest = conversation.latest_insight().and_then(|entry| entry.data.as_ref());
            let record = SaveRecordRequest::new(profile, conversation.entries(), latest);
            debug!(%session_id, entries = conversation.len(), "saving patient record");
            self.cancel.run(self.api.save_record(&record)).await
        };

        match result {
            Ok(response) => {
                if let Some(record_id) = response.record_id() {
                    info!(%record_id, "patient record saved");
                    let message = format!("Patient record saved (ID: {record_id})");
                    self.append(Role::Assistant, message, None);
                    self.view.toast(ToastKind::Success, "Patient record saved");
                } else {
                    warn!(message = ?response.message, "save_patient_record returned no record id");
                    self.view.toast(ToastKind::Error, RECORD_SAVE_FAILED_MESSAGE);
                }
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "save_patient_record failed");
                self.view.toast(ToastKind::Error, RECORD_SAVE_FAILED_MESSAGE);
            }
        }
    }
}
