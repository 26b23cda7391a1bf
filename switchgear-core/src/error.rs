//! Error types for flag evaluation and storage.

use thiserror::Error;

/// Result type for flag operations.
pub type FlagResult<T> = Result<T, FlagError>;

/// Errors surfaced by feature operations.
#[derive(Debug, Error)]
pub enum FlagError {
    /// Storage backend failure. Always propagated; evaluation never
    /// falls back to enabled or disabled on a failed read.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// Mutation referenced a group name with no registered predicate.
    #[error("group not registered: {0}")]
    UnknownGroup(String),

    /// Percentage outside the 0..=100 range.
    #[error("percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(i64),

    /// Expression rejected at mutation time.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
}

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Storage-backend errors.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Connection to the backend failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Value could not be serialized for storage
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored value could not be decoded
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Backend rejected or failed the operation
    #[error("storage error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_error_display() {
        let err = AdapterError::Connection("refused".to_string());
        assert!(format!("{}", err).contains("refused"));
    }

    #[test]
    fn test_adapter_error_wraps_into_flag_error() {
        let err: FlagError = AdapterError::Backend("boom".to_string()).into();
        assert!(matches!(err, FlagError::Adapter(_)));
    }

    #[test]
    fn test_unknown_group_display() {
        let err = FlagError::UnknownGroup("admins".to_string());
        assert_eq!(format!("{}", err), "group not registered: admins");
    }
}
