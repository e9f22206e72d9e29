//! Query options for conversation lookups.

use serde::{Deserialize, Serialize};

/// Page size used when the caller asks for zero or a negative limit.
pub const DEFAULT_QUERY_LIMIT: i64 = 50;

/// Filtering and pagination for a conversation query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Project to list. Normalized by the store before use.
    pub project_path: String,
    /// Maximum number of records; `<= 0` means [`DEFAULT_QUERY_LIMIT`].
    #[serde(default)]
    pub limit: i64,
    /// Number of records to skip from the most recent end.
    #[serde(default)]
    pub offset: i64,
    /// Substring to look for in the prompt or reply.
    #[serde(default)]
    pub search: Option<String>,
}

impl QueryOptions {
    /// Options listing the most recent page for a project.
    pub fn for_project(project_path: impl Into<String>) -> Self {
        Self {
            project_path: project_path.into(),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn effective_limit(&self) -> i64 {
        if self.limit <= 0 {
            DEFAULT_QUERY_LIMIT
        } else {
            self.limit
        }
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.max(0)
    }

    /// The search needle, if one was given and is non-empty.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}
