//! The OAuth2 authorization server state machine.
//!
//! Per authorization attempt: Requested → CodeIssued → Exchanged →
//! (Refreshed | Revoked | Expired). Codes are single-use; consumption is
//! guarded by an in-process mutex because the storage contract has no
//! atomic take primitive.

use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;

use satori_storage::{KvStorage, StorageValue};

use crate::AuthResult;
use crate::config::OAuth2Config;
use crate::error::AuthError;
use crate::oauth2::types::{
    AuthorizationCode, OAuth2AccessToken, OAuth2Client, OAuth2GrantType,
};

const TOKEN_TYPE_BEARER: &str = "Bearer";
const CODE_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;

/// What the store remembers about an outstanding OAuth2 refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OAuth2RefreshGrant {
    client_id: String,
    user_id: String,
    scopes: Vec<String>,
}

/// Self-contained OAuth2 authorization-code server over the storage
/// adapter.
pub struct OAuth2Server {
    storage: Arc<dyn KvStorage>,
    prefix: String,
    config: OAuth2Config,
    exchange_lock: Mutex<()>,
}

impl OAuth2Server {
    /// Creates a server writing under `{prefix}:oauth2:`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn KvStorage>,
        prefix: impl Into<String>,
        config: OAuth2Config,
    ) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
            config,
            exchange_lock: Mutex::new(()),
        }
    }

    fn client_key(&self, client_id: &str) -> String {
        format!("{}:oauth2:client:{client_id}", self.prefix)
    }

    fn code_key(&self, code: &str) -> String {
        format!("{}:oauth2:code:{code}", self.prefix)
    }

    fn token_key(&self, token: &str) -> String {
        format!("{}:oauth2:token:{token}", self.prefix)
    }

    fn refresh_key(&self, token: &str) -> String {
        format!("{}:oauth2:refresh:{token}", self.prefix)
    }

    /// Registers a client, overwriting any previous registration with
    /// the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn register_client(&self, client: &OAuth2Client) -> AuthResult<()> {
        let blob = serde_json::to_string(client)
            .map_err(|err| AuthError::storage(format!("unserializable client: {err}")))?;
        self.storage
            .set(
                &self.client_key(&client.client_id),
                StorageValue::Text(blob),
                None,
            )
            .await?;
        tracing::debug!(client_id = %client.client_id, "oauth2 client registered");
        Ok(())
    }

    /// Looks up a registered client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails or the stored
    /// registration is corrupt.
    pub async fn get_client(&self, client_id: &str) -> AuthResult<Option<OAuth2Client>> {
        let Some(value) = self.storage.get(&self.client_key(client_id)).await? else {
            return Ok(None);
        };
        let client = serde_json::from_str(&value.into_text()?)
            .map_err(|err| AuthError::storage(format!("corrupt client registration: {err}")))?;
        Ok(Some(client))
    }

    /// Issues a short-lived, single-use authorization code bound to
    /// `(client, redirect_uri, user, scopes)`.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` if `client_id` is unregistered
    /// - `InvalidRedirectUri` if `redirect_uri` is not registered for
    ///   the client
    /// - `UnsupportedGrantType` if the client may not use the
    ///   authorization-code grant
    pub async fn generate_authorization_code(
        &self,
        client_id: &str,
        redirect_uri: &str,
        user_id: &str,
        scopes: Vec<String>,
    ) -> AuthResult<AuthorizationCode> {
        let client = self
            .get_client(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client(format!("unknown client: {client_id}")))?;
        if !client.allows_redirect_uri(redirect_uri) {
            return Err(AuthError::invalid_redirect_uri(redirect_uri));
        }
        if !client.allows_grant(OAuth2GrantType::AuthorizationCode) {
            return Err(AuthError::unsupported_grant_type(
                OAuth2GrantType::AuthorizationCode.as_str(),
            ));
        }

        let code = AuthorizationCode {
            code: random_hex(CODE_BYTES),
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            user_id: user_id.to_string(),
            scopes,
            expire_time: (OffsetDateTime::now_utc() + self.config.code_lifetime)
                .unix_timestamp(),
        };
        let blob = serde_json::to_string(&code)
            .map_err(|err| AuthError::storage(format!("unserializable code: {err}")))?;
        self.storage
            .set(
                &self.code_key(&code.code),
                StorageValue::Text(blob),
                Some(self.config.code_lifetime),
            )
            .await?;
        tracing::debug!(client_id, user_id, "authorization code issued");
        Ok(code)
    }

    /// Exchanges an authorization code for an access token. On success
    /// the code is consumed exactly once and a fresh access/refresh pair
    /// is minted and stored.
    ///
    /// # Errors
    ///
    /// - `InvalidCode` if the code is unknown, expired, or already
    ///   consumed
    /// - `InvalidClient` if the client id or secret does not match the
    ///   code's binding
    /// - `InvalidRedirectUri` if the redirect URI does not match the
    ///   code's binding
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> AuthResult<OAuth2AccessToken> {
        // The consume must not race another exchange of the same code.
        let _guard = self.exchange_lock.lock().await;

        let Some(value) = self.storage.get(&self.code_key(code)).await? else {
            return Err(AuthError::invalid_code("unknown, expired, or consumed"));
        };
        let record: AuthorizationCode = serde_json::from_str(&value.into_text()?)
            .map_err(|err| AuthError::storage(format!("corrupt code record: {err}")))?;

        if record.client_id != client_id {
            return Err(AuthError::invalid_client("code was issued to another client"));
        }
        let client = self
            .get_client(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client(format!("unknown client: {client_id}")))?;
        if client.client_secret != client_secret {
            return Err(AuthError::invalid_client("client secret mismatch"));
        }
        if record.redirect_uri != redirect_uri {
            return Err(AuthError::invalid_redirect_uri(redirect_uri));
        }

        self.storage.delete(&self.code_key(code)).await?;

        let token = self
            .mint_access_token(&client.client_id, &record.user_id, record.scopes.clone())
            .await?;
        tracing::debug!(client_id, user_id = %record.user_id, "authorization code exchanged");
        Ok(token)
    }

    /// Re-issues an access token from a refresh token. The refresh token
    /// is returned unchanged (no rotation), mirroring the general
    /// refresh-token manager's policy.
    ///
    /// # Errors
    ///
    /// - `InvalidRefreshToken` if the refresh token is unknown or
    ///   expired
    /// - `InvalidClient` if the credentials do not match the token's
    ///   owning client
    /// - `UnsupportedGrantType` if the client may not use the
    ///   refresh-token grant
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
        client_id: &str,
        client_secret: &str,
    ) -> AuthResult<OAuth2AccessToken> {
        let Some(value) = self.storage.get(&self.refresh_key(refresh_token)).await? else {
            return Err(AuthError::InvalidRefreshToken);
        };
        let grant: OAuth2RefreshGrant = serde_json::from_str(&value.into_text()?)
            .map_err(|err| AuthError::storage(format!("corrupt refresh grant: {err}")))?;

        if grant.client_id != client_id {
            return Err(AuthError::invalid_client(
                "refresh token belongs to another client",
            ));
        }
        let client = self
            .get_client(client_id)
            .await?
            .ok_or_else(|| AuthError::invalid_client(format!("unknown client: {client_id}")))?;
        if client.client_secret != client_secret {
            return Err(AuthError::invalid_client("client secret mismatch"));
        }
        if !client.allows_grant(OAuth2GrantType::RefreshToken) {
            return Err(AuthError::unsupported_grant_type(
                OAuth2GrantType::RefreshToken.as_str(),
            ));
        }

        let access = self
            .issue_access_record(
                &grant.client_id,
                &grant.user_id,
                grant.scopes.clone(),
                refresh_token.to_string(),
            )
            .await?;
        Ok(access)
    }

    /// Checks that an access token exists and has not expired. Read-only.
    ///
    /// # Errors
    ///
    /// Returns `TokenNotFound` for unknown or expired tokens.
    pub async fn validate_access_token(&self, token: &str) -> AuthResult<OAuth2AccessToken> {
        let Some(value) = self.storage.get(&self.token_key(token)).await? else {
            return Err(AuthError::TokenNotFound);
        };
        let record = serde_json::from_str(&value.into_text()?)
            .map_err(|err| AuthError::storage(format!("corrupt access token: {err}")))?;
        Ok(record)
    }

    /// Revokes an access token. Revoking an unknown token is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage delete fails.
    pub async fn revoke_token(&self, token: &str) -> AuthResult<()> {
        self.storage.delete(&self.token_key(token)).await?;
        Ok(())
    }

    /// Mints a brand-new access/refresh pair and stores both records.
    async fn mint_access_token(
        &self,
        client_id: &str,
        user_id: &str,
        scopes: Vec<String>,
    ) -> AuthResult<OAuth2AccessToken> {
        let refresh_token = random_hex(TOKEN_BYTES);
        let grant = OAuth2RefreshGrant {
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            scopes: scopes.clone(),
        };
        let blob = serde_json::to_string(&grant)
            .map_err(|err| AuthError::storage(format!("unserializable refresh grant: {err}")))?;
        self.storage
            .set(
                &self.refresh_key(&refresh_token),
                StorageValue::Text(blob),
                Some(self.config.refresh_token_lifetime),
            )
            .await?;

        self.issue_access_record(client_id, user_id, scopes, refresh_token)
            .await
    }

    /// Stores a new access-token record paired to an existing refresh
    /// token.
    async fn issue_access_record(
        &self,
        client_id: &str,
        user_id: &str,
        scopes: Vec<String>,
        refresh_token: String,
    ) -> AuthResult<OAuth2AccessToken> {
        let record = OAuth2AccessToken {
            token: random_hex(TOKEN_BYTES),
            token_type: TOKEN_TYPE_BEARER.to_string(),
            user_id: user_id.to_string(),
            client_id: client_id.to_string(),
            scopes,
            expires_in: self.config.access_token_lifetime.as_secs() as i64,
            refresh_token,
        };
        let blob = serde_json::to_string(&record)
            .map_err(|err| AuthError::storage(format!("unserializable access token: {err}")))?;
        self.storage
            .set(
                &self.token_key(&record.token),
                StorageValue::Text(blob),
                Some(self.config.access_token_lifetime),
            )
            .await?;
        Ok(record)
    }
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use satori_storage_memory::MemoryStorage;
    use std::time::Duration;

    const REDIRECT: &str = "http://localhost:8080/callback";

    fn server() -> OAuth2Server {
        OAuth2Server::new(
            Arc::new(MemoryStorage::new()),
            "satoken",
            OAuth2Config::default(),
        )
    }

    fn client() -> OAuth2Client {
        OAuth2Client {
            client_id: "webapp".to_string(),
            client_secret: "secret123".to_string(),
            redirect_uris: vec![REDIRECT.to_string()],
            grant_types: vec![
                OAuth2GrantType::AuthorizationCode,
                OAuth2GrantType::RefreshToken,
            ],
            scopes: vec!["read".to_string(), "write".to_string()],
        }
    }

    async fn registered_server() -> OAuth2Server {
        let server = server();
        server.register_client(&client()).await.unwrap();
        server
    }

    #[tokio::test]
    async fn test_register_and_lookup_client() {
        let server = registered_server().await;
        let found = server.get_client("webapp").await.unwrap().unwrap();
        assert_eq!(found, client());
        assert!(server.get_client("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_code_requires_registered_client_and_uri() {
        let server = registered_server().await;

        let err = server
            .generate_authorization_code("ghost", REDIRECT, "u1", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClient { .. }));

        let err = server
            .generate_authorization_code("webapp", "http://evil.example", "u1", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRedirectUri { .. }));
    }

    #[tokio::test]
    async fn test_exchange_consumes_code_exactly_once() {
        let server = registered_server().await;
        let code = server
            .generate_authorization_code("webapp", REDIRECT, "u1", vec!["read".to_string()])
            .await
            .unwrap();

        let token = server
            .exchange_code_for_token(&code.code, "webapp", "secret123", REDIRECT)
            .await
            .unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.user_id, "u1");
        assert_eq!(token.scopes, vec!["read"]);
        assert!(!token.refresh_token.is_empty());

        // Second exchange with the same code fails: already consumed.
        let err = server
            .exchange_code_for_token(&code.code, "webapp", "secret123", REDIRECT)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCode { .. }));
    }

    #[tokio::test]
    async fn test_exchange_validates_binding() {
        let server = registered_server().await;
        let code = server
            .generate_authorization_code("webapp", REDIRECT, "u1", vec![])
            .await
            .unwrap();

        let err = server
            .exchange_code_for_token(&code.code, "webapp", "wrong", REDIRECT)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClient { .. }));

        let err = server
            .exchange_code_for_token(&code.code, "webapp", "secret123", "http://evil.example")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRedirectUri { .. }));

        // Failed attempts must not consume the code.
        server
            .exchange_code_for_token(&code.code, "webapp", "secret123", REDIRECT)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_expired_code_is_rejected() {
        let server = OAuth2Server::new(
            Arc::new(MemoryStorage::new()),
            "satoken",
            OAuth2Config {
                code_lifetime: Duration::from_millis(10),
                ..OAuth2Config::default()
            },
        );
        server.register_client(&client()).await.unwrap();
        let code = server
            .generate_authorization_code("webapp", REDIRECT, "u1", vec![])
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let err = server
            .exchange_code_for_token(&code.code, "webapp", "secret123", REDIRECT)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCode { .. }));
    }

    #[tokio::test]
    async fn test_refresh_does_not_rotate() {
        let server = registered_server().await;
        let code = server
            .generate_authorization_code("webapp", REDIRECT, "u1", vec!["read".to_string()])
            .await
            .unwrap();
        let token = server
            .exchange_code_for_token(&code.code, "webapp", "secret123", REDIRECT)
            .await
            .unwrap();

        let renewed = server
            .refresh_access_token(&token.refresh_token, "webapp", "secret123")
            .await
            .unwrap();
        assert_eq!(renewed.refresh_token, token.refresh_token);
        assert_ne!(renewed.token, token.token);
        assert_eq!(renewed.user_id, "u1");
        assert_eq!(renewed.scopes, vec!["read"]);

        let err = server
            .refresh_access_token(&token.refresh_token, "webapp", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidClient { .. }));

        let err = server
            .refresh_access_token("ghost", "webapp", "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn test_validate_and_revoke() {
        let server = registered_server().await;
        let code = server
            .generate_authorization_code("webapp", REDIRECT, "u1", vec![])
            .await
            .unwrap();
        let token = server
            .exchange_code_for_token(&code.code, "webapp", "secret123", REDIRECT)
            .await
            .unwrap();

        let validated = server.validate_access_token(&token.token).await.unwrap();
        assert_eq!(validated.user_id, "u1");

        server.revoke_token(&token.token).await.unwrap();
        assert!(matches!(
            server.validate_access_token(&token.token).await,
            Err(AuthError::TokenNotFound)
        ));
        // Idempotent.
        server.revoke_token(&token.token).await.unwrap();
    }
}
