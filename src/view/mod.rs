//! Rendering seam.
//!
//! DESIGN
//! ======
//! The controller owns state and talks to the API; everything the user sees
//! goes through `View`. Regions mirror the consultation page: intake form or
//! profile summary, transcript, three insight panels, report trigger,
//! suggestion list, draft input, toasts and blocking prompts.

pub mod terminal;

use crate::insight::{DiagnosisSummary, InsightCard};
use crate::session::conversation::ConversationEntry;
use crate::session::profile::{PatientProfile, ProfileForm};

pub use terminal::TerminalView;

pub const REPORT_LABEL_IDLE: &str = "Generate Report";
pub const REPORT_LABEL_BUSY: &str = "Generating...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

impl ToastKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

pub trait View {
    /// Show the intake form pre-filled with `form`.
    fn show_intake_form(&mut self, form: &ProfileForm);
    /// Replace the intake form with a read-only profile summary.
    fn show_profile_summary(&mut self, profile: &PatientProfile);

    fn append_entry(&mut self, entry: &ConversationEntry);
    fn clear_transcript(&mut self);
    fn set_typing(&mut self, visible: bool);

    fn render_diagnosis(&mut self, summary: &DiagnosisSummary);
    fn render_treatments(&mut self, cards: &[InsightCard]);
    fn render_tests(&mut self, cards: &[InsightCard]);

    fn set_report_trigger(&mut self, enabled: bool, label: &str);
    fn set_suggestions(&mut self, labels: &[&str]);
    fn set_draft(&mut self, text: &str);

    fn toast(&mut self, kind: ToastKind, message: &str);
    /// Blocking notice; returns once acknowledged.
    fn alert(&mut self, message: &str);
    /// Blocking yes/no prompt.
    fn confirm(&mut self, prompt: &str) -> bool;
}
