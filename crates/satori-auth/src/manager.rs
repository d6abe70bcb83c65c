//! The login/session/authorization orchestrator.
//!
//! [`Manager`] composes the token generator, session store, nonce
//! manager, refresh-token manager, and OAuth2 server over one shared
//! storage adapter. It is an explicit, caller-owned instance: construct
//! it once (usually via [`Manager::builder`]) and pass it through your
//! application context.
//!
//! Per `(login_id, device)` the state machine is LoggedOut → LoggedIn
//! via [`Manager::login`] and back via logout/kickout/expiry; there are
//! no intermediate states.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use satori_storage::{KvStorage, StorageValue};

use crate::AuthResult;
use crate::config::{AuthConfig, TokenStyle};
use crate::error::AuthError;
use crate::oauth2::OAuth2Server;
use crate::permission;
use crate::security::{NonceManager, RefreshTokenInfo, RefreshTokenManager};
use crate::session::{self, Session};
use crate::token::TokenGenerator;

/// Device used when the caller does not name one.
pub const DEFAULT_DEVICE: &str = "default";

const DISABLE_VALUE: &str = "1";

fn device_or_default(device: Option<&str>) -> &str {
    match device {
        Some(d) if !d.is_empty() => d,
        _ => DEFAULT_DEVICE,
    }
}

/// Read-only projection of a token's identity.
///
/// The token mapping stores only the login id, so `device` and the
/// times are synthesized defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    /// The identity the token resolves to.
    pub login_id: String,

    /// Device the token is assumed to belong to.
    pub device: String,

    /// Creation time, unix seconds; zero when not retained.
    pub create_time: i64,

    /// Last active time, unix seconds; zero when not retained.
    pub active_time: i64,

    /// Optional caller tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// The authentication manager.
pub struct Manager {
    storage: Arc<dyn KvStorage>,
    config: AuthConfig,
    generator: TokenGenerator,
    prefix: String,
    nonce_manager: NonceManager,
    refresh_manager: RefreshTokenManager,
    oauth2_server: OAuth2Server,
}

impl Manager {
    /// Creates a manager over `storage` with the given configuration.
    #[must_use]
    pub fn new(storage: Arc<dyn KvStorage>, config: AuthConfig) -> Self {
        let prefix = if config.key_prefix.is_empty() {
            "satoken".to_string()
        } else {
            config.key_prefix.clone()
        };
        let generator = TokenGenerator::new(&config);

        Self {
            nonce_manager: NonceManager::new(Arc::clone(&storage), &prefix, config.nonce_ttl),
            refresh_manager: RefreshTokenManager::new(
                Arc::clone(&storage),
                &prefix,
                generator.clone(),
                config.refresh.clone(),
            ),
            oauth2_server: OAuth2Server::new(
                Arc::clone(&storage),
                &prefix,
                config.oauth2.clone(),
            ),
            generator,
            prefix,
            storage,
            config,
        }
    }

    /// Starts building a manager over `storage`.
    #[must_use]
    pub fn builder(storage: Arc<dyn KvStorage>) -> ManagerBuilder {
        ManagerBuilder::new(storage)
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The shared storage adapter.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn KvStorage> {
        &self.storage
    }

    // ============ Login ============

    /// Logs an identity in on a device and returns the issued token.
    ///
    /// Unless `concurrent_login` is configured, any existing token for
    /// the same `(login_id, device)` is kicked out first. The kickout
    /// and the two mapping writes are separate storage operations with
    /// no atomicity guarantee: two concurrent logins for one device can
    /// each evict the other's not-yet-written token, and a crash between
    /// the writes can leave one mapping without its counterpart. Both
    /// are accepted best-effort behavior.
    ///
    /// # Errors
    ///
    /// Returns `AccountDisabled` while a disable record exists, a
    /// `Configuration` error from token generation, or a wrapped storage
    /// failure.
    pub async fn login(&self, login_id: &str, device: Option<&str>) -> AuthResult<String> {
        let device = device_or_default(device);

        if self.is_disable(login_id).await? {
            return Err(AuthError::AccountDisabled);
        }

        if !self.config.concurrent_login {
            self.kickout_token(login_id, device).await?;
        }

        let token = self.generator.generate(login_id, device)?;
        let expiration = self.config.expiration();

        self.storage
            .set(&self.token_key(&token), StorageValue::text(login_id), expiration)
            .await?;
        self.storage
            .set(
                &self.account_key(login_id, device),
                StorageValue::text(&token),
                expiration,
            )
            .await?;

        let mut session = self.get_session(login_id).await?;
        session.set(session::KEY_LOGIN_ID, login_id).await?;
        session.set(session::KEY_DEVICE, device).await?;
        session
            .set(
                session::KEY_LOGIN_TIME,
                OffsetDateTime::now_utc().unix_timestamp(),
            )
            .await?;

        tracing::debug!(login_id, device, "login");
        Ok(token)
    }

    /// Writes both mappings for a caller-supplied token value, for
    /// silent token refresh without generating a new token string.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn login_by_token(
        &self,
        login_id: &str,
        token: &str,
        device: Option<&str>,
    ) -> AuthResult<()> {
        let device = device_or_default(device);
        let expiration = self.config.expiration();

        self.storage
            .set(&self.token_key(token), StorageValue::text(login_id), expiration)
            .await?;
        self.storage
            .set(
                &self.account_key(login_id, device),
                StorageValue::text(token),
                expiration,
            )
            .await?;
        Ok(())
    }

    /// Logs an identity out on a device, deleting the account mapping
    /// and the token mapping it points to. Idempotent: a no-op when no
    /// mapping exists.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn logout(&self, login_id: &str, device: Option<&str>) -> AuthResult<()> {
        let device = device_or_default(device);
        let account_key = self.account_key(login_id, device);

        let Some(value) = self.storage.get(&account_key).await? else {
            return Ok(()); // already logged out
        };
        if let Some(token) = value.as_text() {
            self.storage.delete(&self.token_key(token)).await?;
        } else {
            tracing::debug!(login_id, device, "dropping malformed account mapping");
        }
        self.storage.delete(&account_key).await?;

        tracing::debug!(login_id, device, "logout");
        Ok(())
    }

    /// Deletes only the token mapping for `token`. The reverse account
    /// mapping is left to expire on its own.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn logout_by_token(&self, token: &str) -> AuthResult<()> {
        if token.is_empty() {
            return Ok(());
        }
        self.storage.delete(&self.token_key(token)).await?;
        Ok(())
    }

    /// Forcibly invalidates the token currently mapped to
    /// `(login_id, device)`. The account entry is left to expire
    /// naturally; the token holder becomes unauthenticated on their next
    /// check. Tokens of other devices are untouched.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn kickout(&self, login_id: &str, device: Option<&str>) -> AuthResult<()> {
        let device = device_or_default(device);
        self.kickout_token(login_id, device).await?;
        tracing::debug!(login_id, device, "kickout");
        Ok(())
    }

    async fn kickout_token(&self, login_id: &str, device: &str) -> AuthResult<()> {
        let Some(value) = self
            .storage
            .get(&self.account_key(login_id, device))
            .await?
        else {
            return Ok(());
        };
        if let Some(token) = value.as_text() {
            self.storage.delete(&self.token_key(token)).await?;
        }
        Ok(())
    }

    // ============ Token validation ============

    /// Returns `true` if `token` maps to a live login. Storage failures
    /// read as not-logged-in.
    ///
    /// When `auto_renew` is on and a timeout is configured, a successful
    /// check also extends the token's TTL from a detached task: the
    /// caller never waits on it and its failure is discarded (renewal is
    /// best-effort; the next check retries).
    pub async fn is_login(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        let key = self.token_key(token);

        match self.storage.exists(&key).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                tracing::debug!(error = %err, "token existence check failed");
                return false;
            }
        }

        if self.config.auto_renew {
            if let Some(ttl) = self.config.expiration() {
                let storage = Arc::clone(&self.storage);
                tokio::spawn(async move {
                    if let Err(err) = storage.expire(&key, Some(ttl)).await {
                        tracing::debug!(error = %err, "token renewal failed");
                    }
                });
            }
        }

        true
    }

    /// Like [`Manager::is_login`], but returns `NotLogin` instead of
    /// `false`.
    ///
    /// # Errors
    ///
    /// Returns `NotLogin` when the token does not map to a live login.
    pub async fn check_login(&self, token: &str) -> AuthResult<()> {
        if self.is_login(token).await {
            Ok(())
        } else {
            Err(AuthError::NotLogin)
        }
    }

    /// Resolves `token` to its login id, failing with `NotLogin` first
    /// when the token is not live.
    ///
    /// # Errors
    ///
    /// Returns `NotLogin`, `TokenNotFound`, or `InvalidTokenData`.
    pub async fn get_login_id(&self, token: &str) -> AuthResult<String> {
        if !self.is_login(token).await {
            return Err(AuthError::NotLogin);
        }
        self.get_login_id_not_check(token).await
    }

    /// Resolves `token` to its login id without the liveness check.
    ///
    /// # Errors
    ///
    /// Returns `TokenNotFound` when no mapping exists, or
    /// `InvalidTokenData` when the stored mapping is malformed.
    pub async fn get_login_id_not_check(&self, token: &str) -> AuthResult<String> {
        let Some(value) = self.storage.get(&self.token_key(token)).await? else {
            return Err(AuthError::TokenNotFound);
        };
        value
            .into_text()
            .map_err(|err| AuthError::invalid_token_data(err.to_string()))
    }

    /// Reverse lookup: the token currently held by `(login_id, device)`.
    ///
    /// # Errors
    ///
    /// Returns `TokenNotFound` when the identity has no active login on
    /// that device.
    pub async fn get_token_value(
        &self,
        login_id: &str,
        device: Option<&str>,
    ) -> AuthResult<String> {
        let device = device_or_default(device);
        let Some(value) = self
            .storage
            .get(&self.account_key(login_id, device))
            .await?
        else {
            return Err(AuthError::TokenNotFound);
        };
        value
            .into_text()
            .map_err(|err| AuthError::invalid_token_data(err.to_string()))
    }

    /// Token metadata projection.
    ///
    /// # Errors
    ///
    /// Returns `TokenNotFound` or `InvalidTokenData`.
    pub async fn get_token_info(&self, token: &str) -> AuthResult<TokenInfo> {
        let login_id = self.get_login_id_not_check(token).await?;
        Ok(TokenInfo {
            login_id,
            device: DEFAULT_DEVICE.to_string(),
            create_time: 0,
            active_time: 0,
            tag: None,
        })
    }

    // ============ Account disable ============

    /// Disables an account for `duration`. A zero duration disables
    /// permanently (until [`Manager::untie`]).
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn disable(&self, login_id: &str, duration: Duration) -> AuthResult<()> {
        let ttl = if duration.is_zero() {
            None
        } else {
            Some(duration)
        };
        self.storage
            .set(&self.disable_key(login_id), StorageValue::text(DISABLE_VALUE), ttl)
            .await?;
        tracing::debug!(login_id, ?duration, "account disabled");
        Ok(())
    }

    /// Re-enables a disabled account. A no-op when no disable record
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn untie(&self, login_id: &str) -> AuthResult<()> {
        self.storage.delete(&self.disable_key(login_id)).await?;
        tracing::debug!(login_id, "account untied");
        Ok(())
    }

    /// Returns `true` while a disable record exists for `login_id`.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn is_disable(&self, login_id: &str) -> AuthResult<bool> {
        Ok(self.storage.exists(&self.disable_key(login_id)).await?)
    }

    /// Remaining disable time in seconds: `-2` when no record exists,
    /// `-1` when the record never expires, otherwise the remaining whole
    /// seconds.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn get_disable_time(&self, login_id: &str) -> AuthResult<i64> {
        let ttl = self.storage.ttl(&self.disable_key(login_id)).await?;
        Ok(ttl.as_seconds())
    }

    // ============ Sessions ============

    /// The session for `login_id`, restored from storage or freshly
    /// constructed when none exists yet.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn get_session(&self, login_id: &str) -> AuthResult<Session> {
        match Session::load(login_id, Arc::clone(&self.storage), &self.prefix).await? {
            Some(session) => Ok(session),
            None => Ok(Session::new(
                login_id,
                Arc::clone(&self.storage),
                &self.prefix,
            )),
        }
    }

    /// The session owning `token`.
    ///
    /// # Errors
    ///
    /// Returns `NotLogin` when the token is not live, plus the
    /// [`Manager::get_session`] failures.
    pub async fn get_session_by_token(&self, token: &str) -> AuthResult<Session> {
        let login_id = self.get_login_id(token).await?;
        self.get_session(&login_id).await
    }

    /// Destroys the session for `login_id`. A no-op when none exists.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn delete_session(&self, login_id: &str) -> AuthResult<()> {
        if let Some(session) =
            Session::load(login_id, Arc::clone(&self.storage), &self.prefix).await?
        {
            session.destroy().await?;
        }
        Ok(())
    }

    // ============ Permissions ============

    /// Replaces the permission patterns granted to `login_id`.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn set_permissions(
        &self,
        login_id: &str,
        permissions: Vec<String>,
    ) -> AuthResult<()> {
        let mut session = self.get_session(login_id).await?;
        session.set(session::KEY_PERMISSIONS, permissions).await
    }

    /// The permission patterns granted to `login_id`; empty when none
    /// were ever set.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn get_permissions(&self, login_id: &str) -> AuthResult<Vec<String>> {
        let session = self.get_session(login_id).await?;
        Ok(value_to_string_list(session.get(session::KEY_PERMISSIONS)))
    }

    /// Returns `true` if any granted pattern matches `permission`.
    /// Failures read as unauthorized.
    pub async fn has_permission(&self, login_id: &str, permission: &str) -> bool {
        match self.get_permissions(login_id).await {
            Ok(granted) => granted
                .iter()
                .any(|pattern| permission::matches(pattern, permission)),
            Err(err) => {
                tracing::debug!(login_id, error = %err, "permission lookup failed");
                false
            }
        }
    }

    /// Returns `true` if every listed permission is granted.
    pub async fn has_permissions_and(&self, login_id: &str, permissions: &[&str]) -> bool {
        for permission in permissions {
            if !self.has_permission(login_id, permission).await {
                return false;
            }
        }
        true
    }

    /// Returns `true` if at least one listed permission is granted.
    pub async fn has_permissions_or(&self, login_id: &str, permissions: &[&str]) -> bool {
        for permission in permissions {
            if self.has_permission(login_id, permission).await {
                return true;
            }
        }
        false
    }

    /// Like [`Manager::has_permission`], but returns `PermissionDenied`
    /// instead of `false`.
    ///
    /// # Errors
    ///
    /// Returns `PermissionDenied` when the permission is not granted.
    pub async fn check_permission(&self, login_id: &str, permission: &str) -> AuthResult<()> {
        if self.has_permission(login_id, permission).await {
            Ok(())
        } else {
            Err(AuthError::permission_denied(permission))
        }
    }

    // ============ Roles ============

    /// Replaces the roles granted to `login_id`.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn set_roles(&self, login_id: &str, roles: Vec<String>) -> AuthResult<()> {
        let mut session = self.get_session(login_id).await?;
        session.set(session::KEY_ROLES, roles).await
    }

    /// The roles granted to `login_id`; empty when none were ever set.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn get_roles(&self, login_id: &str) -> AuthResult<Vec<String>> {
        let session = self.get_session(login_id).await?;
        Ok(value_to_string_list(session.get(session::KEY_ROLES)))
    }

    /// Returns `true` if `login_id` holds `role` (exact match, no
    /// wildcards). Failures read as unauthorized.
    pub async fn has_role(&self, login_id: &str, role: &str) -> bool {
        match self.get_roles(login_id).await {
            Ok(roles) => roles.iter().any(|granted| granted == role),
            Err(err) => {
                tracing::debug!(login_id, error = %err, "role lookup failed");
                false
            }
        }
    }

    /// Returns `true` if every listed role is held.
    pub async fn has_roles_and(&self, login_id: &str, roles: &[&str]) -> bool {
        for role in roles {
            if !self.has_role(login_id, role).await {
                return false;
            }
        }
        true
    }

    /// Returns `true` if at least one listed role is held.
    pub async fn has_roles_or(&self, login_id: &str, roles: &[&str]) -> bool {
        for role in roles {
            if self.has_role(login_id, role).await {
                return true;
            }
        }
        false
    }

    /// Like [`Manager::has_role`], but returns `RoleDenied` instead of
    /// `false`.
    ///
    /// # Errors
    ///
    /// Returns `RoleDenied` when the role is not held.
    pub async fn check_role(&self, login_id: &str, role: &str) -> AuthResult<()> {
        if self.has_role(login_id, role).await {
            Ok(())
        } else {
            Err(AuthError::role_denied(role))
        }
    }

    // ============ Session queries ============

    /// All live tokens of `login_id`, across devices.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn get_token_value_list_by_login_id(
        &self,
        login_id: &str,
    ) -> AuthResult<Vec<String>> {
        let pattern = format!("{}:account:{login_id}:*", self.prefix);
        let keys = self.storage.keys(&pattern).await?;

        let mut tokens = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.storage.get(&key).await? {
                if let Some(token) = value.as_text() {
                    tokens.push(token.to_string());
                }
            }
        }
        Ok(tokens)
    }

    /// Number of live device sessions for `login_id`.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn get_session_count_by_login_id(&self, login_id: &str) -> AuthResult<usize> {
        Ok(self.get_token_value_list_by_login_id(login_id).await?.len())
    }

    // ============ Security features ============

    /// Generates a one-time anti-replay nonce.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn generate_nonce(&self) -> AuthResult<String> {
        self.nonce_manager.generate().await
    }

    /// Consumes a nonce; `true` at most once per generated value.
    pub async fn verify_nonce(&self, nonce: &str) -> bool {
        self.nonce_manager.verify(nonce).await
    }

    /// Issues an access/refresh token pair for `(login_id, device)`.
    ///
    /// # Errors
    ///
    /// Returns a token generation or wrapped storage failure.
    pub async fn login_with_refresh_token(
        &self,
        login_id: &str,
        device: Option<&str>,
    ) -> AuthResult<RefreshTokenInfo> {
        self.refresh_manager
            .generate_token_pair(login_id, device_or_default(device))
            .await
    }

    /// Exchanges a refresh token for a new access token (same refresh
    /// token, refreshed expiry).
    ///
    /// # Errors
    ///
    /// Returns `InvalidRefreshToken` when the token is unknown or
    /// expired.
    pub async fn refresh_access_token(
        &self,
        refresh_token: &str,
    ) -> AuthResult<RefreshTokenInfo> {
        self.refresh_manager.refresh_access_token(refresh_token).await
    }

    /// Revokes a refresh token.
    ///
    /// # Errors
    ///
    /// Returns a wrapped storage failure.
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> AuthResult<()> {
        self.refresh_manager.revoke_refresh_token(refresh_token).await
    }

    /// The embedded OAuth2 authorization server.
    #[must_use]
    pub fn oauth2(&self) -> &OAuth2Server {
        &self.oauth2_server
    }

    // ============ Keys ============

    fn token_key(&self, token: &str) -> String {
        format!("{}:token:{token}", self.prefix)
    }

    fn account_key(&self, login_id: &str, device: &str) -> String {
        format!("{}:account:{login_id}:{device}", self.prefix)
    }

    fn disable_key(&self, login_id: &str) -> String {
        format!("{}:disable:{login_id}", self.prefix)
    }
}

/// Lenient projection of a session value into a string list; anything
/// that is not an array of strings reads as empty.
fn value_to_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Builder for [`Manager`].
///
/// ```ignore
/// let manager = Manager::builder(storage)
///     .token_style(TokenStyle::Random64)
///     .timeout(Duration::from_secs(86_400))
///     .build();
/// ```
pub struct ManagerBuilder {
    storage: Arc<dyn KvStorage>,
    config: AuthConfig,
}

impl ManagerBuilder {
    fn new(storage: Arc<dyn KvStorage>) -> Self {
        Self {
            storage,
            config: AuthConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the token name hint for bindings.
    #[must_use]
    pub fn token_name(mut self, name: impl Into<String>) -> Self {
        self.config.token_name = name.into();
        self
    }

    /// Sets the token generation style.
    #[must_use]
    pub fn token_style(mut self, style: TokenStyle) -> Self {
        self.config.token_style = style;
        self
    }

    /// Sets the login token lifetime. Zero means tokens never expire.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the storage key prefix.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Sets the JWT signing secret.
    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = Some(secret.into());
        self
    }

    /// Sets whether concurrent multi-login per device is permitted.
    #[must_use]
    pub fn concurrent_login(mut self, concurrent: bool) -> Self {
        self.config.concurrent_login = concurrent;
        self
    }

    /// Sets whether tokens auto-renew on check.
    #[must_use]
    pub fn auto_renew(mut self, auto_renew: bool) -> Self {
        self.config.auto_renew = auto_renew;
        self
    }

    /// Sets the anti-replay nonce lifetime.
    #[must_use]
    pub fn nonce_ttl(mut self, ttl: Duration) -> Self {
        self.config.nonce_ttl = ttl;
        self
    }

    /// Builds the manager.
    #[must_use]
    pub fn build(self) -> Manager {
        Manager::new(self.storage, self.config)
    }
}
