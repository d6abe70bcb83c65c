//! Access/refresh token pairs, independent of the main login tokens.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use satori_storage::{KvStorage, StorageValue};

use crate::AuthResult;
use crate::config::RefreshTokenConfig;
use crate::error::AuthError;
use crate::token::TokenGenerator;

fn refresh_key(prefix: &str, token: &str) -> String {
    format!("{prefix}:refresh:{token}")
}

fn access_key(prefix: &str, token: &str) -> String {
    format!("{prefix}:access:{token}")
}

/// What the store remembers about an outstanding refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RefreshGrant {
    login_id: String,
    device: String,
}

/// An issued access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenInfo {
    /// Short-lived access token.
    pub access_token: String,

    /// Long-lived refresh token. Not rotated on use: repeated refresh
    /// calls return this same value until it is revoked or expires.
    pub refresh_token: String,

    /// Unix seconds at which the access token expires.
    pub expire_time: i64,
}

/// Issues and renews access/refresh token pairs.
pub struct RefreshTokenManager {
    storage: Arc<dyn KvStorage>,
    prefix: String,
    generator: TokenGenerator,
    config: RefreshTokenConfig,
}

impl RefreshTokenManager {
    /// Creates a manager writing under `{prefix}:refresh:` and
    /// `{prefix}:access:`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn KvStorage>,
        prefix: impl Into<String>,
        generator: TokenGenerator,
        config: RefreshTokenConfig,
    ) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            generator,
            config,
        }
    }

    /// Issues a fresh access/refresh pair for `(login_id, device)`.
    ///
    /// # Errors
    ///
    /// Returns an error if token generation or a storage write fails.
    pub async fn generate_token_pair(
        &self,
        login_id: &str,
        device: &str,
    ) -> AuthResult<RefreshTokenInfo> {
        let refresh_token = self.generator.generate(login_id, device)?;
        let grant = RefreshGrant {
            login_id: login_id.to_string(),
            device: device.to_string(),
        };
        let blob = serde_json::to_string(&grant)
            .map_err(|err| AuthError::storage(format!("unserializable refresh grant: {err}")))?;
        self.storage
            .set(
                &refresh_key(&self.prefix, &refresh_token),
                StorageValue::Text(blob),
                Some(self.config.refresh_token_lifetime),
            )
            .await?;

        self.issue_access_token(&grant, refresh_token).await
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// The refresh token itself is returned unchanged (no rotation);
    /// only the access token and expiry are new.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRefreshToken` if the token is unknown, expired,
    /// or revoked.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<RefreshTokenInfo> {
        let Some(value) = self
            .storage
            .get(&refresh_key(&self.prefix, refresh_token))
            .await?
        else {
            return Err(AuthError::InvalidRefreshToken);
        };
        let grant: RefreshGrant = serde_json::from_str(&value.into_text()?)
            .map_err(|err| AuthError::storage(format!("corrupt refresh grant: {err}")))?;

        self.issue_access_token(&grant, refresh_token.to_string())
            .await
    }

    /// Revokes a refresh token. Access tokens already issued from it
    /// ride out their own TTL. Revoking an unknown token is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage delete fails.
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> AuthResult<()> {
        self.storage
            .delete(&refresh_key(&self.prefix, refresh_token))
            .await?;
        Ok(())
    }

    async fn issue_access_token(
        &self,
        grant: &RefreshGrant,
        refresh_token: String,
    ) -> AuthResult<RefreshTokenInfo> {
        let access_token = self.generator.generate(&grant.login_id, &grant.device)?;
        self.storage
            .set(
                &access_key(&self.prefix, &access_token),
                StorageValue::text(&grant.login_id),
                Some(self.config.access_token_lifetime),
            )
            .await?;

        let expire_time = (OffsetDateTime::now_utc() + self.config.access_token_lifetime)
            .unix_timestamp();
        Ok(RefreshTokenInfo {
            access_token,
            refresh_token,
            expire_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use satori_storage_memory::MemoryStorage;
    use std::time::Duration;

    fn manager(storage: Arc<dyn KvStorage>) -> RefreshTokenManager {
        let config = AuthConfig::default();
        RefreshTokenManager::new(
            storage,
            "satoken",
            TokenGenerator::new(&config),
            config.refresh,
        )
    }

    #[tokio::test]
    async fn test_pair_issues_distinct_tokens() {
        let manager = manager(Arc::new(MemoryStorage::new()));
        let pair = manager.generate_token_pair("u1", "web").await.unwrap();
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_ne!(pair.access_token, pair.refresh_token);
        assert!(pair.expire_time > OffsetDateTime::now_utc().unix_timestamp());
    }

    #[tokio::test]
    async fn test_refresh_keeps_same_refresh_token() {
        let manager = manager(Arc::new(MemoryStorage::new()));
        let pair = manager.generate_token_pair("u1", "web").await.unwrap();

        let renewed = manager
            .refresh_access_token(&pair.refresh_token)
            .await
            .unwrap();
        assert_eq!(renewed.refresh_token, pair.refresh_token);
        assert_ne!(renewed.access_token, pair.access_token);
    }

    #[tokio::test]
    async fn test_unknown_refresh_token_is_rejected() {
        let manager = manager(Arc::new(MemoryStorage::new()));
        let err = manager.refresh_access_token("nope").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_stops_refreshing() {
        let storage: Arc<dyn KvStorage> = Arc::new(MemoryStorage::new());
        let manager = manager(storage.clone());
        let pair = manager.generate_token_pair("u1", "web").await.unwrap();

        manager
            .revoke_refresh_token(&pair.refresh_token)
            .await
            .unwrap();
        assert!(matches!(
            manager.refresh_access_token(&pair.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
        // Revocation does not touch the already-issued access mapping.
        assert!(
            storage
                .exists(&access_key("satoken", &pair.access_token))
                .await
                .unwrap()
        );
        // Revoking again is a no-op.
        manager
            .revoke_refresh_token(&pair.refresh_token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_rejected() {
        let config = AuthConfig::default();
        let manager = RefreshTokenManager::new(
            Arc::new(MemoryStorage::new()),
            "satoken",
            TokenGenerator::new(&config),
            RefreshTokenConfig {
                access_token_lifetime: Duration::from_secs(3600),
                refresh_token_lifetime: Duration::from_millis(10),
            },
        );
        let pair = manager.generate_token_pair("u1", "web").await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(
            manager.refresh_access_token(&pair.refresh_token).await,
            Err(AuthError::InvalidRefreshToken)
        ));
    }
}
