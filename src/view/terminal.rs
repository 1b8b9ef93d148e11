//! Plain-text terminal rendering of the consultation page.

#[cfg(test)]
#[path = "terminal_test.rs"]
mod terminal_test;

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

use super::{ToastKind, View};
use crate::insight::{DiagnosisSummary, InsightCard};
use crate::session::conversation::{ConversationEntry, Role};
use crate::session::profile::{PatientProfile, ProfileForm};

pub struct TerminalView<W, R> {
    out: W,
    input: R,
    draft: String,
    typing: bool,
    suggestions: Vec<String>,
}

impl<W: Write, R: BufRead> TerminalView<W, R> {
    pub fn new(out: W, input: R) -> Self {
        Self { out, input, draft: String::new(), typing: false, suggestions: Vec::new() }
    }

    /// Prompt and read one line. `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying streams.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.out, "{prompt}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }

    /// Take the current draft, leaving it empty.
    pub fn take_draft(&mut self) -> String {
        std::mem::take(&mut self.draft)
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn print(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    pub fn into_output(self) -> W {
        self.out
    }
}

// =============================================================================
// FORMATTING
// =============================================================================

#[must_use]
pub fn format_entry(entry: &ConversationEntry) -> String {
    let speaker = match entry.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    format!("{speaker}: {}", entry.message)
}

#[must_use]
pub fn format_diagnosis(summary: &DiagnosisSummary) -> String {
    let mut text = format!("Diagnosis: {}", summary.label);
    if let Some(percent) = summary.confidence_percent {
        let _ = write!(text, "\n  Confidence: {percent}%");
    }
    if let Some(urgency) = &summary.urgency {
        let _ = write!(text, "\n  Urgency: [{urgency}]");
    }
    text
}

#[must_use]
pub fn format_card(card: &InsightCard) -> String {
    let mut text = format!("- {}\n    {}", card.title, card.description);
    if let Some(dosage) = &card.dosage {
        let _ = write!(text, "\n    Dosage: {dosage}");
    }
    if let Some(code) = &card.code {
        let _ = write!(text, "\n    Code: {code}");
    }
    text
}

#[must_use]
pub fn format_profile(profile: &PatientProfile) -> String {
    format!(
        "Patient: {}\n  Age: {}\n  Gender: {}\n  Contact: {}\n  Medical history: {}",
        profile.name, profile.age, profile.gender, profile.contact, profile.medical_history
    )
}

fn form_value(value: &str) -> &str {
    if value.is_empty() { "(empty)" } else { value }
}

// =============================================================================
// VIEW
// =============================================================================

impl<W: Write, R: BufRead> View for TerminalView<W, R> {
    fn show_intake_form(&mut self, form: &ProfileForm) {
        let text = format!(
            "== Patient intake ==\n  Name: {}\n  Age: {}\n  Gender: {}\n  Contact: {}\n  Medical history: {}\nUse /start to submit.",
            form_value(&form.name),
            form_value(&form.age),
            form_value(&form.gender),
            form_value(&form.contact),
            form_value(&form.medical_history)
        );
        self.print(&text);
    }

    fn show_profile_summary(&mut self, profile: &PatientProfile) {
        let text = format!("== Profile ==\n{}", format_profile(profile));
        self.print(&text);
    }

    fn append_entry(&mut self, entry: &ConversationEntry) {
        let text = format_entry(entry);
        self.print(&text);
    }

    fn clear_transcript(&mut self) {
        self.print("---- chat cleared ----");
    }

    fn set_typing(&mut self, visible: bool) {
        if visible && !self.typing {
            self.print("Assistant is typing...");
        }
        self.typing = visible;
    }

    fn render_diagnosis(&mut self, summary: &DiagnosisSummary) {
        let text = format_diagnosis(summary);
        self.print(&text);
    }

    fn render_treatments(&mut self, cards: &[InsightCard]) {
        self.print("Treatment recommendations:");
        for card in cards {
            let text = format_card(card);
            self.print(&text);
        }
    }

    fn render_tests(&mut self, cards: &[InsightCard]) {
        self.print("Recommended tests:");
        for card in cards {
            let text = format_card(card);
            self.print(&text);
        }
    }

    fn set_report_trigger(&mut self, enabled: bool, label: &str) {
        let state = if enabled { "ready" } else { "busy" };
        let text = format!("[report: {label} ({state})]");
        self.print(&text);
    }

    fn set_suggestions(&mut self, labels: &[&str]) {
        self.suggestions = labels.iter().map(|l| (*l).to_owned()).collect();
        let mut text = String::from("Quick suggestions (/suggest <n>):");
        for (index, label) in labels.iter().enumerate() {
            let _ = write!(text, "\n  {}. {label}", index + 1);
        }
        self.print(&text);
    }

    fn set_draft(&mut self, text: &str) {
        text.clone_into(&mut self.draft);
        if !text.is_empty() {
            let line = format!("Draft: {text} (press Enter to send)");
            self.print(&line);
        }
    }

    fn toast(&mut self, kind: ToastKind, message: &str) {
        let text = format!("[{}] {message}", kind.as_str());
        self.print(&text);
    }

    fn alert(&mut self, message: &str) {
        let text = format!("! {message}");
        self.print(&text);
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        let prompt = format!("{prompt} [y/N] ");
        match self.read_line(&prompt) {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}
