use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use time::OffsetDateTime;

use satori_storage::{KeyTtl, KvStorage, StorageResult, StorageValue};

/// A stored value plus its absolute expiry instant.
#[derive(Debug, Clone)]
struct Entry {
    value: StorageValue,
    expires_at: Option<OffsetDateTime>,
}

impl Entry {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory key-value storage using a papaya lock-free hash map.
///
/// Cloning is cheap: clones share the same underlying map, mirroring how
/// a networked backend would share one server.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<PapayaHashMap<String, Entry>>,
}

impl MemoryStorage {
    /// Creates a new, empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
        }
    }

    /// Number of live (non-expired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        self.data
            .pin()
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .count()
    }

    /// Returns `true` if the storage holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads an entry, reclaiming it if it has expired.
    fn live_entry(&self, key: &str) -> Option<Entry> {
        let now = OffsetDateTime::now_utc();
        let guard = self.data.pin();
        let entry = guard.get(key)?;
        if entry.is_expired(now) {
            guard.remove(key);
            return None;
        }
        Some(entry.clone())
    }
}

fn glob_match(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl KvStorage for MemoryStorage {
    async fn set(
        &self,
        key: &str,
        value: StorageValue,
        ttl: Option<Duration>,
    ) -> StorageResult<()> {
        let expires_at = ttl.map(|d| OffsetDateTime::now_utc() + d);
        self.data
            .pin()
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<StorageValue>> {
        Ok(self.live_entry(key).map(|entry| entry.value))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.data.pin().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.live_entry(key).is_some())
    }

    async fn expire(&self, key: &str, ttl: Option<Duration>) -> StorageResult<()> {
        if let Some(entry) = self.live_entry(key) {
            let expires_at = ttl.map(|d| OffsetDateTime::now_utc() + d);
            self.data.pin().insert(
                key.to_string(),
                Entry {
                    value: entry.value,
                    expires_at,
                },
            );
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> StorageResult<KeyTtl> {
        match self.live_entry(key) {
            None => Ok(KeyTtl::Missing),
            Some(Entry {
                expires_at: None, ..
            }) => Ok(KeyTtl::Persistent),
            Some(Entry {
                expires_at: Some(at),
                ..
            }) => {
                let remaining = at - OffsetDateTime::now_utc();
                Ok(KeyTtl::Remaining(
                    Duration::try_from(remaining).unwrap_or(Duration::ZERO),
                ))
            }
        }
    }

    async fn keys(&self, pattern: &str) -> StorageResult<Vec<String>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .data
            .pin()
            .iter()
            .filter(|(key, entry)| !entry.is_expired(now) && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
