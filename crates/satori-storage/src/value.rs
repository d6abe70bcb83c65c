//! Typed storage payloads.
//!
//! Backends only ever see a closed set of value variants. Structured
//! records (sessions, OAuth2 entities, refresh grants) are serialized to
//! JSON text by the caller before they reach the store, so no backend has
//! to reason about arbitrary payload types and no read site performs an
//! unchecked downcast.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Value stored under a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum StorageValue {
    /// A single UTF-8 string.
    Text(String),
    /// An ordered list of strings.
    List(Vec<String>),
}

impl StorageValue {
    /// Creates a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a list value.
    #[must_use]
    pub fn list(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    /// Returns the variant name, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::List(_) => "list",
        }
    }

    /// Returns the text content, or `None` for other variants.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(_) => None,
        }
    }

    /// Returns the list content, or `None` for other variants.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            Self::Text(_) => None,
        }
    }

    /// Consumes the value, returning the text content.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WrongType`] if the value is not text.
    pub fn into_text(self) -> Result<String, StorageError> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(StorageError::WrongType {
                expected: "text",
                found: other.kind(),
            }),
        }
    }

    /// Consumes the value, returning the list content.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WrongType`] if the value is not a list.
    pub fn into_list(self) -> Result<Vec<String>, StorageError> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(StorageError::WrongType {
                expected: "list",
                found: other.kind(),
            }),
        }
    }
}

impl From<String> for StorageValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for StorageValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for StorageValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let text = StorageValue::text("hello");
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.as_list(), None);
        assert_eq!(text.kind(), "text");

        let list = StorageValue::list(["a", "b"]);
        assert_eq!(list.as_list(), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(list.as_text(), None);
        assert_eq!(list.kind(), "list");
    }

    #[test]
    fn test_into_text_rejects_list() {
        let err = StorageValue::list(["a"]).into_text().unwrap_err();
        assert!(matches!(
            err,
            StorageError::WrongType {
                expected: "text",
                found: "list"
            }
        ));
    }

    #[test]
    fn test_serde_round_trip() {
        let value = StorageValue::list(["read", "write"]);
        let json = serde_json::to_string(&value).unwrap();
        let back: StorageValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
