//! Per-identity session store.
//!
//! A session is keyed by login id, not by token, so every device logged
//! in under one identity shares the same bag of values. The whole
//! session is one JSON object persisted under a single storage key:
//! every `set` is a full write of the serialized map, so concurrent
//! mutators are last-writer-wins. Sessions carry no TTL of their own;
//! they live until destroyed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use satori_storage::{KvStorage, StorageValue};

use crate::AuthResult;
use crate::error::AuthError;

/// Reserved session key: the owning login id.
pub const KEY_LOGIN_ID: &str = "loginId";
/// Reserved session key: device of the most recent login.
pub const KEY_DEVICE: &str = "device";
/// Reserved session key: unix seconds of the most recent login.
pub const KEY_LOGIN_TIME: &str = "loginTime";
/// Reserved session key: granted permission patterns.
pub const KEY_PERMISSIONS: &str = "permissions";
/// Reserved session key: granted roles.
pub const KEY_ROLES: &str = "roles";

fn session_key(prefix: &str, login_id: &str) -> String {
    format!("{prefix}:session:{login_id}")
}

/// A per-identity key/value bag persisted through the storage adapter.
pub struct Session {
    login_id: String,
    key: String,
    data: HashMap<String, Value>,
    storage: Arc<dyn KvStorage>,
}

impl Session {
    /// Constructs an empty session for `login_id`. Nothing is persisted
    /// until the first `set`.
    #[must_use]
    pub fn new(login_id: impl Into<String>, storage: Arc<dyn KvStorage>, prefix: &str) -> Self {
        let login_id = login_id.into();
        Self {
            key: session_key(prefix, &login_id),
            login_id,
            data: HashMap::new(),
            storage,
        }
    }

    /// Restores the session stored for `login_id`, or `None` when no
    /// session exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails or the stored blob is
    /// corrupt.
    pub async fn load(
        login_id: impl Into<String>,
        storage: Arc<dyn KvStorage>,
        prefix: &str,
    ) -> AuthResult<Option<Self>> {
        let login_id = login_id.into();
        let key = session_key(prefix, &login_id);

        let Some(value) = storage.get(&key).await? else {
            return Ok(None);
        };
        let blob = value.into_text()?;
        let data: HashMap<String, Value> = serde_json::from_str(&blob)
            .map_err(|err| AuthError::storage(format!("corrupt session blob: {err}")))?;

        Ok(Some(Self {
            key,
            login_id,
            data,
            storage,
        }))
    }

    /// The identity owning this session.
    #[must_use]
    pub fn login_id(&self) -> &str {
        &self.login_id
    }

    /// Reads a value. `None` means the key was never set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Stores a value and persists the whole session.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized or the storage
    /// write fails.
    pub async fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> AuthResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|err| AuthError::storage(format!("unserializable session value: {err}")))?;
        self.data.insert(key.into(), value);
        self.persist().await
    }

    /// Removes a value and persists the whole session. Removing an
    /// absent key still persists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn remove(&mut self, key: &str) -> AuthResult<()> {
        self.data.remove(key);
        self.persist().await
    }

    /// Deletes the underlying storage entry, consuming the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage delete fails.
    pub async fn destroy(self) -> AuthResult<()> {
        self.storage.delete(&self.key).await?;
        Ok(())
    }

    async fn persist(&self) -> AuthResult<()> {
        let blob = serde_json::to_string(&self.data)
            .map_err(|err| AuthError::storage(format!("unserializable session: {err}")))?;
        self.storage
            .set(&self.key, StorageValue::Text(blob), None)
            .await?;
        Ok(())
    }
}
