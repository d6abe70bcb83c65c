//! One-time anti-replay nonces.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tokio::sync::Mutex;

use satori_storage::{KvStorage, StorageValue};

use crate::AuthResult;

const NONCE_BYTES: usize = 16;

fn nonce_key(prefix: &str, nonce: &str) -> String {
    format!("{prefix}:nonce:{nonce}")
}

/// Issues and single-use-verifies anti-replay tokens.
///
/// Verification is check-and-delete under an in-process mutex, so a
/// given nonce verifies true at most once per process. The storage
/// contract has no atomic take primitive; deployments spanning multiple
/// processes against one shared store need a backend-side guard instead.
pub struct NonceManager {
    storage: Arc<dyn KvStorage>,
    prefix: String,
    ttl: Duration,
    verify_lock: Mutex<()>,
}

impl NonceManager {
    /// Creates a manager writing under `{prefix}:nonce:`.
    #[must_use]
    pub fn new(storage: Arc<dyn KvStorage>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            ttl,
            verify_lock: Mutex::new(()),
        }
    }

    /// Generates a nonce, stores it with the configured TTL, and returns
    /// it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn generate(&self) -> AuthResult<String> {
        let mut bytes = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let nonce = hex::encode(bytes);

        self.storage
            .set(
                &nonce_key(&self.prefix, &nonce),
                StorageValue::text("1"),
                Some(self.ttl),
            )
            .await?;
        Ok(nonce)
    }

    /// Consumes a nonce. Returns `true` only the first time a generated
    /// value is verified before its TTL elapses; replays, unknown values,
    /// and expired values return `false`. Storage failures also read as
    /// `false`: an unverifiable nonce is an invalid nonce.
    pub async fn verify(&self, nonce: &str) -> bool {
        if nonce.is_empty() {
            return false;
        }
        let key = nonce_key(&self.prefix, nonce);

        let _guard = self.verify_lock.lock().await;
        match self.storage.exists(&key).await {
            Ok(true) => {
                if let Err(err) = self.storage.delete(&key).await {
                    tracing::debug!(error = %err, "nonce delete failed");
                    return false;
                }
                true
            }
            Ok(false) => false,
            Err(err) => {
                tracing::debug!(error = %err, "nonce lookup failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_storage_memory::MemoryStorage;

    fn manager(ttl: Duration) -> NonceManager {
        NonceManager::new(Arc::new(MemoryStorage::new()), "satoken", ttl)
    }

    #[tokio::test]
    async fn test_verify_succeeds_exactly_once() {
        let manager = manager(Duration::from_secs(300));
        let nonce = manager.generate().await.unwrap();
        assert_eq!(nonce.len(), NONCE_BYTES * 2);

        assert!(manager.verify(&nonce).await);
        assert!(!manager.verify(&nonce).await);
    }

    #[tokio::test]
    async fn test_unknown_and_empty_nonce_fail() {
        let manager = manager(Duration::from_secs(300));
        assert!(!manager.verify("deadbeef").await);
        assert!(!manager.verify("").await);
    }

    #[tokio::test]
    async fn test_expired_nonce_fails() {
        let manager = manager(Duration::from_millis(10));
        let nonce = manager.generate().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!manager.verify(&nonce).await);
    }
}
