//! Shared types for the agent-tracker conversation history.

mod conversation;
mod query;

pub use conversation::*;
pub use query::*;
