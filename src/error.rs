//! Error types for taskpulse
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in the taskpulse core
#[derive(Debug, Error)]
pub enum TaskpulseError {
    /// Job not found in storage
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// No handler registered for a job type
    #[error("No runner registered for job_type={0}")]
    HandlerNotFound(String),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Schedule that cannot produce a representable next due time
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Storage/persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for taskpulse operations
pub type Result<T> = std::result::Result<T, TaskpulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_not_found_error() {
        let err = TaskpulseError::JobNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Job not found: abc");
    }

    #[test]
    fn test_handler_not_found_error() {
        let err = TaskpulseError::HandlerNotFound("reminder".to_string());
        assert_eq!(err.to_string(), "No runner registered for job_type=reminder");
    }

    #[test]
    fn test_invalid_state_error() {
        let err = TaskpulseError::InvalidState("scheduler already stopping".to_string());
        assert_eq!(err.to_string(), "Invalid state: scheduler already stopping");
    }

    #[test]
    fn test_invalid_schedule_error() {
        let err = TaskpulseError::InvalidSchedule("interval of 9 minutes overflows".to_string());
        assert_eq!(err.to_string(), "Invalid schedule: interval of 9 minutes overflows");
    }

    #[test]
    fn test_storage_error() {
        let err = TaskpulseError::Storage("database locked".to_string());
        assert_eq!(err.to_string(), "Storage error: database locked");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TaskpulseError = io_err.into();
        assert!(matches!(err, TaskpulseError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: TaskpulseError = json_err.into();
        assert!(matches!(err, TaskpulseError::Json(_)));
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let err: TaskpulseError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, TaskpulseError::Sqlite(_)));
    }
}
