//! Error types for the conversation store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// The store could not be created, opened or initialized.
    #[error("Storage unavailable: {context}: {source}")]
    StorageUnavailable {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Storage write failed: {context}: {source}")]
    StorageWriteFailed {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Storage read failed: {context}: {source}")]
    StorageReadFailed {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl TrackerError {
    pub(crate) fn unavailable(
        context: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::StorageUnavailable {
            context,
            source: source.into(),
        }
    }

    pub(crate) fn write(context: &'static str, source: rusqlite::Error) -> Self {
        Self::StorageWriteFailed { context, source }
    }

    pub(crate) fn read(context: &'static str, source: rusqlite::Error) -> Self {
        Self::StorageReadFailed { context, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = TrackerError::write("insert conversation", rusqlite::Error::InvalidQuery);
        let message = err.to_string();
        assert!(message.starts_with("Storage write failed: insert conversation"));
    }

    #[test]
    fn test_unavailable_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = TrackerError::unavailable("create data directory", io);
        assert!(matches!(err, TrackerError::StorageUnavailable { .. }));
        assert_eq!(err.source().map(|s| s.to_string()), Some("denied".to_string()));
    }
}
