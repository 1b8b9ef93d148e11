//! Session state owned by a single consultation controller.
//!
//! DESIGN
//! ======
//! One `SessionState` replaces the page-level globals: the validated
//! profile, the server-issued session id and the conversation log. The only
//! transition is `NoSession -> SessionActive`; there is no close.

pub mod conversation;
pub mod profile;


use conversation::Conversation;
use profile::{PatientProfile, ProfileForm};

/// Client-side validation failures. Surfaced as blocking alerts; none of
/// them mutate state or reach the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields: {}", .fields.join(", "))]
    MissingRequired { fields: Vec<&'static str> },

    #[error("Please enter a valid age (got \"{0}\")")]
    InvalidAge(String),

    #[error("Please start a consultation first")]
    NoSession,

    #[error("Please enter at least one symptom")]
    NoSymptoms,

    #[error("Please name a diagnosis or run a symptom check first")]
    NoDiagnosis,
}

#[derive(Debug, Default)]
pub struct SessionState {
    form: ProfileForm,
    profile: Option<PatientProfile>,
    session_id: Option<String>,
    conversation: Conversation,
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session_id.is_some()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&PatientProfile> {
        self.profile.as_ref()
    }

    /// Last submitted intake form, used to pre-fill the form on edit.
    #[must_use]
    pub fn form(&self) -> &ProfileForm {
        &self.form
    }

    pub fn remember_form(&mut self, form: ProfileForm) {
        self.form = form;
    }

    /// Record a successful session start.
    pub fn activate(&mut self, profile: PatientProfile, session_id: String) {
        self.profile = Some(profile);
        self.session_id = Some(session_id);
    }

    /// Session id and profile together, or [`ValidationError::NoSession`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NoSession`] before the first successful start.
    pub fn require_active(&self) -> Result<(&str, &PatientProfile), ValidationError> {
        match (self.session_id.as_deref(), self.profile.as_ref()) {
            (Some(id), Some(profile)) => Ok((id, profile)),
            _ => Err(ValidationError::NoSession),
        }
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }
}
