//! Error types for tempora.

use thiserror::Error;

/// Result type alias using tempora's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tempora operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Import entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(uuid::Uuid),

    /// Event not found
    #[error("Event not found: {0}")]
    EventNotFound(uuid::Uuid),

    /// Analysis run not found
    #[error("Analysis not found: {0}")]
    AnalysisNotFound(uuid::Uuid),

    /// Malformed request or payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Task already locked or claimed by another batch
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Format or date parsing failed (recovered row-locally)
    #[error("Parse error: {0}")]
    Parse(String),

    /// AI provider call failed, timed out, or returned a schema-mismatched response
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Conversion precondition not met (missing title or start)
    #[error("Conversion precondition failed: {0}")]
    Precondition(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("template 42".to_string());
        assert_eq!(err.to_string(), "Not found: template 42");
    }

    #[test]
    fn test_error_display_entry_not_found() {
        let id = Uuid::nil();
        let err = Error::EntryNotFound(id);
        assert_eq!(err.to_string(), format!("Entry not found: {}", id));
    }

    #[test]
    fn test_error_display_conflict() {
        let err = Error::Conflict("task already locked".to_string());
        assert_eq!(err.to_string(), "Conflict: task already locked");
    }

    #[test]
    fn test_error_display_external_service() {
        let err = Error::ExternalService("provider returned 503".to_string());
        assert_eq!(
            err.to_string(),
            "External service error: provider returned 503"
        );
    }

    #[test]
    fn test_error_display_precondition() {
        let err = Error::Precondition("parsed_title is null".to_string());
        assert_eq!(
            err.to_string(),
            "Conversion precondition failed: parsed_title is null"
        );
    }

    #[test]
    fn test_error_display_parse() {
        let err = Error::Parse("unparseable date".to_string());
        assert_eq!(err.to_string(), "Parse error: unparseable date");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
