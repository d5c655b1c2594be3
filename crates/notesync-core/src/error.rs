//! Error types for notesync.

use thiserror::Error;

/// Result type alias using notesync's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notesync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed input, detected before any remote call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not permitted in the note's current state
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Reading from a remote service failed
    #[error("Remote read failed: {0}")]
    RemoteRead(String),

    /// Writing to a remote service failed
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    /// The image upload failed after the note record had been created.
    ///
    /// `compensated` is true when the orphaned record was removed again.
    #[error("Image upload failed for note {note_id} (record removed: {compensated}): {reason}")]
    UploadFailed {
        note_id: String,
        compensated: bool,
        reason: String,
    },

    /// A create or delete was committed but the refresh that follows it failed.
    ///
    /// The write must not be retried; the previously displayed notes are stale.
    #[error("{committed} succeeded but the follow-up refresh failed: {reason}")]
    RefreshFailed { committed: String, reason: String },

    /// A remote call did not complete within the configured timeout
    #[error("Timed out after {secs}s: {op}")]
    Timeout { op: String, secs: u64 },

    /// No signed-in identity is available
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error originated from (or while waiting on) a remote service.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Error::RemoteRead(_)
                | Error::RemoteWrite(_)
                | Error::UploadFailed { .. }
                | Error::RefreshFailed { .. }
                | Error::Timeout { .. }
                | Error::Request(_)
        )
    }

    /// Re-tag a gateway failure as a read failure for `op`.
    ///
    /// Local errors (validation, precondition, timeout, auth) keep their variant.
    pub fn into_remote_read(self, op: &str) -> Self {
        match self {
            Error::Request(msg) | Error::Serialization(msg) | Error::Internal(msg) => {
                Error::RemoteRead(format!("{}: {}", op, msg))
            }
            Error::RemoteWrite(msg) => Error::RemoteRead(format!("{}: {}", op, msg)),
            other => other,
        }
    }

    /// Re-tag a gateway failure as a write failure for `op`.
    pub fn into_remote_write(self, op: &str) -> Self {
        match self {
            Error::Request(msg) | Error::Serialization(msg) | Error::Internal(msg) => {
                Error::RemoteWrite(format!("{}: {}", op, msg))
            }
            Error::RemoteRead(msg) => Error::RemoteWrite(format!("{}: {}", op, msg)),
            other => other,
        }
    }
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

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("name is required".to_string());
        assert_eq!(err.to_string(), "Validation error: name is required");
    }

    #[test]
    fn test_error_display_precondition() {
        let err = Error::Precondition("note has no id".to_string());
        assert_eq!(err.to_string(), "Precondition failed: note has no id");
    }

    #[test]
    fn test_error_display_upload_failed() {
        let err = Error::UploadFailed {
            note_id: "abc".to_string(),
            compensated: true,
            reason: "bucket unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Image upload failed for note abc (record removed: true): bucket unavailable"
        );
    }

    #[test]
    fn test_error_display_timeout() {
        let err = Error::Timeout {
            op: "list".to_string(),
            secs: 30,
        };
        assert_eq!(err.to_string(), "Timed out after 30s: list");
    }

    #[test]
    fn test_error_display_refresh_failed() {
        let err = Error::RefreshFailed {
            committed: "delete of note abc".to_string(),
            reason: "list timed out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "delete of note abc succeeded but the follow-up refresh failed: list timed out"
        );
        assert!(err.is_remote());
    }

    #[test]
    fn test_is_remote() {
        assert!(Error::RemoteRead("x".into()).is_remote());
        assert!(Error::RemoteWrite("x".into()).is_remote());
        assert!(Error::Request("x".into()).is_remote());
        assert!(Error::Timeout {
            op: "x".into(),
            secs: 1
        }
        .is_remote());
        assert!(!Error::Validation("x".into()).is_remote());
        assert!(!Error::Precondition("x".into()).is_remote());
        assert!(!Error::Unauthorized("x".into()).is_remote());
    }

    #[test]
    fn test_into_remote_read_wraps_transport_errors() {
        let err = Error::Request("connection refused".into()).into_remote_read("list");
        match err {
            Error::RemoteRead(msg) => assert_eq!(msg, "list: connection refused"),
            other => panic!("Expected RemoteRead, got {:?}", other),
        }
    }

    #[test]
    fn test_into_remote_write_keeps_timeout() {
        let err = Error::Timeout {
            op: "create".into(),
            secs: 5,
        }
        .into_remote_write("create");
        assert!(matches!(err, Error::Timeout { .. }));
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
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
