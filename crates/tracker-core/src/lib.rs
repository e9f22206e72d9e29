//! Conversation history storage for agent-tracker.

mod db;
mod error;
pub mod path;
pub mod timestamp;

pub use db::{ConversationStore, default_db_path};
pub use error::TrackerError;
pub use path::normalize_project_path;
pub use tracker_types::{Conversation, ConversationStatus, DEFAULT_QUERY_LIMIT, QueryOptions};

/// Result type for conversation store operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
