//! Error types for the Caretaker client core.

use thiserror::Error;

/// A shared error type for the Caretaker crates.
///
/// Variants are grouped by how the auth reconciler treats them: transient
/// failures (`Network`, `Timeout`) are retried within budget, everything
/// else is terminal for the attempt that produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaretakerError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Transport-level failure talking to the backend
    #[error("Network error: {0}")]
    Network(String),

    /// A bounded remote call did not complete in time
    #[error("Timed out after {after_ms}ms: {operation}")]
    Timeout { operation: String, after_ms: u64 },

    /// The backend rejected the credentials or session token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend answered with an error that is not transport related
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CaretakerError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a Timeout error for the named operation
    pub fn timeout(operation: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after_ms: after.as_millis() as u64,
        }
    }

    /// Creates a Provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is worth retrying.
    ///
    /// Only transport failures and timeouts qualify. A missing session,
    /// a rejected token or a missing profile are definitive answers.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for CaretakerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for CaretakerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CaretakerError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CaretakerError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, CaretakerError>`.
pub type Result<T> = std::result::Result<T, CaretakerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transient_classification() {
        assert!(CaretakerError::network("connection reset").is_transient());
        assert!(CaretakerError::timeout("get_current_user", Duration::from_millis(1500)).is_transient());
        assert!(!CaretakerError::Unauthorized("bad jwt".into()).is_transient());
        assert!(!CaretakerError::not_found("Profile", "u1").is_transient());
        assert!(!CaretakerError::provider("500").is_transient());
    }

    #[test]
    fn test_timeout_message() {
        let err = CaretakerError::timeout("get_profile", Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Timed out after 1500ms: get_profile");
    }

    #[test]
    fn test_from_toml_error() {
        let parsed: std::result::Result<toml::Value, _> = toml::from_str("not = = toml");
        let err: CaretakerError = parsed.unwrap_err().into();
        assert!(matches!(err, CaretakerError::Serialization { ref format, .. } if format == "TOML"));
    }
}
