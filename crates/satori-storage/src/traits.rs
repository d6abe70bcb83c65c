//! The expiring key-value storage trait.
//!
//! Defines the interface every Satori component persists through.
//! Implementations are provided by storage backends (e.g. the in-memory
//! backend in `satori-storage-memory`, or a networked cache).

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::value::StorageValue;

/// Remaining lifetime of a key, as reported by [`KvStorage::ttl`].
///
/// "Key absent" and "key without expiry" are distinct, typed answers so
/// callers never have to interpret sentinel durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (or has already expired).
    Missing,
    /// The key exists and never expires.
    Persistent,
    /// The key exists and expires after the contained duration.
    Remaining(Duration),
}

impl KeyTtl {
    /// Converts to the conventional seconds encoding of TTL-bearing
    /// stores: `-2` for a missing key, `-1` for a key without expiry,
    /// otherwise the remaining whole seconds.
    #[must_use]
    pub fn as_seconds(&self) -> i64 {
        match self {
            Self::Missing => -2,
            Self::Persistent => -1,
            Self::Remaining(d) => d.as_secs() as i64,
        }
    }
}

/// Storage operations for expiring key-value data.
///
/// A `ttl` of `None` means the key never expires. Expired keys are
/// treated as absent: `get` returns `Ok(None)`, `exists` returns
/// `Ok(false)`, and `keys` does not list them. `get` on a missing key is
/// `Ok(None)`, not an error, so callers can distinguish "absent" from an
/// I/O failure.
///
/// Implementations must be safe for concurrent use from arbitrary
/// numbers of callers and must guarantee read-after-write visibility for
/// a single caller.
///
/// # Example
///
/// ```ignore
/// use satori_storage::{KvStorage, StorageValue};
///
/// async fn example(storage: &dyn KvStorage) -> satori_storage::StorageResult<()> {
///     storage
///         .set("satori:token:abc", StorageValue::text("user-1"), None)
///         .await?;
///     let value = storage.get("satori:token:abc").await?;
///     assert_eq!(value.and_then(|v| v.into_text().ok()).as_deref(), Some("user-1"));
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait KvStorage: Send + Sync {
    /// Stores a value under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn set(
        &self,
        key: &str,
        value: StorageValue,
        ttl: Option<Duration>,
    ) -> StorageResult<()>;

    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn get(&self, key: &str) -> StorageResult<Option<StorageValue>>;

    /// Deletes `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Returns `true` if `key` exists and has not expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Replaces the expiry of `key`. `None` removes any expiry.
    ///
    /// Expiring an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn expire(&self, key: &str, ttl: Option<Duration>) -> StorageResult<()>;

    /// Reports the remaining lifetime of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn ttl(&self, key: &str) -> StorageResult<KeyTtl>;

    /// Lists the live keys matching `pattern`.
    ///
    /// Only a trailing-`*` glob is supported: `account:u1:*` matches every
    /// key starting with `account:u1:`; a pattern without `*` matches
    /// exactly. This is sufficient to enumerate all device tokens of one
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend operation fails.
    async fn keys(&self, pattern: &str) -> StorageResult<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ttl_seconds() {
        assert_eq!(KeyTtl::Missing.as_seconds(), -2);
        assert_eq!(KeyTtl::Persistent.as_seconds(), -1);
        assert_eq!(KeyTtl::Remaining(Duration::from_secs(90)).as_seconds(), 90);
    }
}
