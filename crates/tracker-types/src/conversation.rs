//! Conversation history types.
//!
//! A conversation is one prompt→reply cycle recorded against a project
//! directory. Records are created when the user submits a prompt and completed
//! once the assistant finishes replying.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a conversation record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Prompt recorded, no completion yet.
    #[default]
    Open,
    /// Reply, transcript and end time have been written.
    Completed,
}

impl ConversationStatus {
    /// Status implied by whether an end time was ever recorded, readable
    /// or not.
    pub fn from_end_recorded(recorded: bool) -> Self {
        if recorded { Self::Completed } else { Self::Open }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single logged conversation for a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Store-assigned identifier, increasing with insertion order.
    pub id: i64,
    /// Normalized project directory this conversation belongs to.
    pub project_path: String,
    /// External session correlation token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// When the prompt was recorded (UTC).
    pub started_at: DateTime<Utc>,
    /// When the conversation was completed (None while open).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_reply: Option<String>,
    /// Reference to the full transcript artifact, set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<String>,
    pub status: ConversationStatus,
}

impl Conversation {
    pub fn is_completed(&self) -> bool {
        self.status == ConversationStatus::Completed
    }

    /// Wall-clock duration between start and completion.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|ended| ended - self.started_at)
    }
}
