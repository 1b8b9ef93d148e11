//! Append-only conversation log.
//!
//! Entries are strictly time-ordered by creation: a timestamp earlier than
//! the previous entry (wall clock stepped backwards) is clamped to it.

#[cfg(test)]
#[path = "conversation_test.rs"]
mod conversation_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::format_description;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub message: String,
    /// Raw structured payload attached to an assistant turn, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub timestamp: String,
}

#[derive(Debug, Default)]
pub struct Conversation {
    entries: Vec<ConversationEntry>,
    last_at: Option<OffsetDateTime>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current time.
    pub fn push(&mut self, role: Role, message: impl Into<String>, data: Option<Value>) -> &ConversationEntry {
        self.push_at(role, message, data, OffsetDateTime::now_utc())
    }

    pub(crate) fn push_at(
        &mut self,
        role: Role,
        message: impl Into<String>,
        data: Option<Value>,
        at: OffsetDateTime,
    ) -> &ConversationEntry {
        let at = match self.last_at {
            Some(last) if at < last => last,
            _ => at,
        };
        self.last_at = Some(at);
        self.entries.push(ConversationEntry {
            role,
            message: message.into(),
            data,
            timestamp: format_timestamp(at),
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Drop every entry. Ordering restarts from the next push.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_at = None;
    }

    #[must_use]
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent assistant entry that carries a structured payload.
    #[must_use]
    pub fn latest_insight(&self) -> Option<&ConversationEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.role == Role::Assistant && entry.data.is_some())
    }
}

/// Format as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
#[must_use]
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let utc = at.to_offset(time::UtcOffset::UTC);
    utc.format(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ))
    .unwrap_or_default()
}
