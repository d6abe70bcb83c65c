//! Storage error types.

/// Errors that can occur while talking to a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend failed to execute the operation (I/O, connection, ...).
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// A stored value had a different variant than the caller expected.
    #[error("Wrong value type: expected {expected}, found {found}")]
    WrongType {
        /// The variant the caller asked for.
        expected: &'static str,
        /// The variant actually stored.
        found: &'static str,
    },

    /// A structured record could not be serialized or deserialized.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Type alias for storage operation results.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::backend("connection refused");
        assert_eq!(err.to_string(), "Backend error: connection refused");

        let err = StorageError::WrongType {
            expected: "text",
            found: "list",
        };
        assert_eq!(err.to_string(), "Wrong value type: expected text, found list");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StorageError::from(parse_err);
        assert!(matches!(err, StorageError::Serialization { .. }));
    }
}
