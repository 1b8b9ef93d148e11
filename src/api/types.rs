//! Consultation API wire types and errors.
//!
//! Requests borrow from controller state; responses are decoded once here
//! into typed shapes so the controller never sniffs raw JSON.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::insight::{MedicalInsight, RecommendationEntry, Recommendations};
use crate::session::conversation::ConversationEntry;
use crate::session::profile::PatientProfile;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by consultation API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("API request failed: {0}")]
    Request(String),

    /// The server returned a non-success HTTP status.
    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// The request was abandoned before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// A URL could not be built from the base URL and a server-provided path.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_API_REQUEST",
            Self::Status { .. } => "E_API_STATUS",
            Self::Parse(_) => "E_API_PARSE",
            Self::Cancelled => "E_CANCELLED",
            Self::InvalidUrl(_) => "E_INVALID_URL",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ReportRequest<'a> {
    pub session_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct DiagnosisRequest<'a> {
    pub symptoms: &'a [String],
    pub patient_data: &'a PatientProfile,
}

/// Body of `/treatment`: the diagnosis to plan for and who it is for.
#[derive(Debug, Serialize)]
pub struct TreatmentRequest<'a> {
    pub diagnosis: TreatmentDiagnosis<'a>,
    pub patient_data: &'a PatientProfile,
}

#[derive(Debug, Serialize)]
pub struct TreatmentDiagnosis<'a> {
    pub primary_diagnosis: &'a str,
    pub symptoms: &'a [String],
}

/// Body of `/save_patient_record`.
#[derive(Debug, Serialize)]
pub struct SaveRecordRequest<'a> {
    pub patient_data: &'a PatientProfile,
    pub conversation: &'a [ConversationEntry],
    pub diagnosis: Value,
    pub treatment: Value,
}

const DIAGNOSIS_KEYS: &[&str] = &[
    "suggested_diagnosis",
    "confidence",
    "urgency",
    "symptoms",
    "analysis",
    "recommended_tests",
];
const TREATMENT_KEYS: &[&str] = &["treatment_recommendations", "follow_up_advice", "self_care_tips"];

impl<'a> SaveRecordRequest<'a> {
    /// Split the latest insight payload into the record's diagnosis and
    /// treatment sections. Missing payload yields empty objects.
    #[must_use]
    pub fn new(patient_data: &'a PatientProfile, conversation: &'a [ConversationEntry], latest_insight: Option<&Value>) -> Self {
        Self {
            patient_data,
            conversation,
            diagnosis: pick_keys(latest_insight, DIAGNOSIS_KEYS),
            treatment: pick_keys(latest_insight, TREATMENT_KEYS),
        }
    }
}

fn pick_keys(source: Option<&Value>, keys: &[&str]) -> Value {
    let mut picked = Map::new();
    if let Some(Value::Object(map)) = source {
        for key in keys {
            if let Some(value) = map.get(*key) {
                picked.insert((*key).to_owned(), value.clone());
            }
        }
    }
    Value::Object(picked)
}

// =============================================================================
// RESPONSES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StartSessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// An assistant turn from `/chat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    pub message: String,
    /// Server-side classification (`diagnosis`, `emergency`, `error`, ...).
    pub kind: Option<String>,
    /// Raw payload, kept verbatim for history.
    pub data: Option<Value>,
    /// The payload decoded as an insight. `None` when absent or malformed.
    pub insight: Option<MedicalInsight>,
}

impl AssistantReply {
    #[must_use]
    pub fn is_emergency(&self) -> bool {
        self.kind.as_deref() == Some("emergency")
    }
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    response: ChatReplyBody,
}

#[derive(Debug, Deserialize)]
struct ChatReplyBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Decode a `/chat` response body.
///
/// # Errors
///
/// Returns [`ApiError::Parse`] if the body is not JSON or lacks `response`.
pub fn parse_chat_response(text: &str) -> Result<AssistantReply, ApiError> {
    let envelope: ChatEnvelope = serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))?;
    let body = envelope.response;
    let data = body.data.filter(Value::is_object);
    let insight = data.as_ref().and_then(|value| {
        serde_json::from_value::<MedicalInsight>(value.clone())
            .inspect_err(|e| warn!(error = %e, "chat insight payload did not decode"))
            .ok()
    });
    Ok(AssistantReply {
        message: body.message.unwrap_or_default(),
        kind: body.kind,
        data,
        insight,
    })
}

/// The three report shapes, in the order they are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// A server-hosted file to fetch.
    Url(String),
    /// Business error reported by the server.
    ServerError(String),
    /// The PDF itself, base64 encoded.
    PdfBase64(String),
    /// None of the known fields were present.
    Unhandled,
}

#[derive(Debug, Default, Deserialize)]
struct RawReportResponse {
    #[serde(default)]
    report_url: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    pdf_base64: Option<String>,
}

/// Decode a `/generate_report` response body. Empty strings count as absent.
///
/// # Errors
///
/// Returns [`ApiError::Parse`] if the body is not a JSON object.
pub fn parse_report_response(text: &str) -> Result<ReportOutcome, ApiError> {
    let raw: RawReportResponse = serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))?;

    if let Some(url) = raw.report_url.filter(|s| !s.is_empty()) {
        return Ok(ReportOutcome::Url(url));
    }
    match raw.error {
        Some(Value::String(message)) if !message.is_empty() => return Ok(ReportOutcome::ServerError(message)),
        Some(Value::String(_) | Value::Null | Value::Bool(false)) | None => {}
        Some(other) => return Ok(ReportOutcome::ServerError(other.to_string())),
    }
    if let Some(encoded) = raw.pdf_base64.filter(|s| !s.is_empty()) {
        return Ok(ReportOutcome::PdfBase64(encoded));
    }
    Ok(ReportOutcome::Unhandled)
}

/// A candidate condition from `/diagnosis`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PossibleCondition {
    pub name: String,
    #[serde(default)]
    pub match_score: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiagnosisResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub possible_diseases: Vec<PossibleCondition>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub recommended_tests: Option<Recommendations>,
    #[serde(default)]
    pub urgency_level: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub const UNDETERMINED_DIAGNOSIS: &str = "Requires further evaluation";

impl DiagnosisResponse {
    /// The server's business error, if it reported one.
    #[must_use]
    pub fn server_error(&self) -> Option<&str> {
        if self.status.as_deref() == Some("error") {
            return Some(self.error.as_deref().unwrap_or("symptom check failed"));
        }
        None
    }

    /// Panel content for this result: the top-ranked condition plus tests.
    #[must_use]
    pub fn to_insight(&self) -> MedicalInsight {
        let top = self.possible_diseases.first();
        MedicalInsight {
            suggested_diagnosis: Some(top.map_or(UNDETERMINED_DIAGNOSIS, |c| c.name.as_str()).to_owned()),
            confidence: top.and_then(|c| c.match_score),
            urgency: self
                .urgency_level
                .clone()
                .or_else(|| top.and_then(|c| c.urgency.clone())),
            treatment_recommendations: None,
            recommended_tests: self.recommended_tests.clone(),
        }
    }
}

/// A plan from `/treatment`. Medications arrive as `{name, purpose, dosage}`
/// objects and decode through the same shapes as any recommendation list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TreatmentPlan {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub treatments: Option<Recommendations>,
    #[serde(default)]
    pub medications: Option<Recommendations>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub follow_up: Option<String>,
    #[serde(default)]
    pub patient_specific_adjustments: Vec<String>,
    #[serde(default)]
    pub recommended_tests: Option<Recommendations>,
}

impl TreatmentPlan {
    /// Panel content: treatments followed by medications, plus any tests.
    #[must_use]
    pub fn to_insight(&self) -> MedicalInsight {
        let mut entries = Vec::new();
        for recommendations in [&self.treatments, &self.medications].into_iter().flatten() {
            entries.extend(recommendations.clone().into_entries());
        }
        MedicalInsight {
            treatment_recommendations: (!entries.is_empty()).then_some(Recommendations::List(entries)),
            recommended_tests: self.recommended_tests.clone(),
            ..MedicalInsight::default()
        }
    }

    /// History payload for the plan, shaped so a later record save files it
    /// under the treatment section next to the diagnosis it answers.
    #[must_use]
    pub fn history_payload(&self, diagnosis: &str) -> Value {
        let mut payload = serde_json::to_value(self.to_insight()).unwrap_or_else(|_| Value::Object(Map::new()));
        if let Value::Object(map) = &mut payload {
            map.insert("suggested_diagnosis".to_owned(), Value::String(diagnosis.to_owned()));
            if let Some(follow_up) = &self.follow_up {
                map.insert("follow_up_advice".to_owned(), Value::String(follow_up.clone()));
            }
        }
        payload
    }

    /// The assistant entry text for the plan.
    #[must_use]
    pub fn summary(&self, diagnosis: &str) -> String {
        let mut text = format!("Treatment plan for {}", self.name.as_deref().unwrap_or(diagnosis));
        if let Some(duration) = &self.duration {
            let _ = write!(text, "\nDuration: {duration}");
        }
        if let Some(follow_up) = &self.follow_up {
            let _ = write!(text, "\nFollow-up: {follow_up}");
        }
        for adjustment in &self.patient_specific_adjustments {
            let _ = write!(text, "\nNote: {adjustment}");
        }
        text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TreatmentResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub treatment_plan: Option<TreatmentPlan>,
    /// Generic advice the server sends alongside an error.
    #[serde(default)]
    pub basic_recommendations: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TreatmentResponse {
    /// The server's business error. A success without a plan counts as one.
    #[must_use]
    pub fn server_error(&self) -> Option<&str> {
        if self.status.as_deref() == Some("error") {
            return Some(self.error.as_deref().unwrap_or("treatment plan unavailable"));
        }
        if self.treatment_plan.is_none() {
            return Some("treatment plan missing from response");
        }
        None
    }

    /// `basic_recommendations` as a treatment list, if the server sent any.
    #[must_use]
    pub fn fallback_insight(&self) -> Option<MedicalInsight> {
        if self.basic_recommendations.is_empty() {
            return None;
        }
        let entries = self.basic_recommendations.iter().cloned().map(RecommendationEntry::Text).collect();
        Some(MedicalInsight {
            treatment_recommendations: Some(Recommendations::List(entries)),
            ..MedicalInsight::default()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SaveRecordResponse {
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

const RECORD_SAVE_FAILURE_PREFIX: &str = "Error saving record";

impl SaveRecordResponse {
    /// The stored record id. The server reports write failures in the id
    /// field itself, so those are filtered out here.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        self.record_id
            .as_deref()
            .filter(|id| !id.is_empty() && !id.starts_with(RECORD_SAVE_FAILURE_PREFIX))
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
