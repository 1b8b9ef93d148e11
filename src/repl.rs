//! Line commands for the interactive front end.

#[cfg(test)]
#[path = "repl_test.rs"]
mod repl_test;

pub const HELP_TEXT: &str = "\
Commands:
  /start              fill in the intake form and start a consultation
  /edit               show the intake form again
  /report             generate the consultation report
  /clear              clear the chat history
  /check a, b, ...    run a symptom check
  /treatment [dx]     get a treatment plan (default: the last diagnosis)
  /save               save the patient record
  /suggest <n>        copy quick suggestion <n> into the draft
  /help               show this help
  /quit               exit
Anything else is sent as a chat message. An empty line sends the draft.
Ctrl-C cancels the request in flight; at an idle prompt it exits.";

use crate::cancel::CancelHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Edit,
    Report,
    Clear,
    Check(Vec<String>),
    /// Diagnosis to plan for; empty means the latest one.
    Treatment(String),
    Save,
    /// Zero-based suggestion index.
    Suggest(usize),
    Help,
    Quit,
    Message(String),
    SendDraft,
    Unknown(String),
}

#[must_use]
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::SendDraft;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Message(line.to_owned());
    };
    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "edit" => Command::Edit,
        "report" => Command::Report,
        "clear" => Command::Clear,
        "check" => Command::Check(
            args.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        ),
        "treatment" => Command::Treatment(args.to_owned()),
        "save" => Command::Save,
        "suggest" => match args.parse::<usize>() {
            Ok(n) if n >= 1 => Command::Suggest(n - 1),
            _ => Command::Unknown(line.to_owned()),
        },
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_owned()),
    }
}

/// What a Ctrl-C did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// A request was in flight and has been abandoned.
    Cancelled,
    /// Nothing was running; the front end should exit.
    Quit,
}

/// Cancel the request in flight, or ask to quit at an idle prompt.
#[must_use]
pub fn on_interrupt(handle: &CancelHandle) -> Interrupt {
    if handle.cancel() { Interrupt::Cancelled } else { Interrupt::Quit }
}
