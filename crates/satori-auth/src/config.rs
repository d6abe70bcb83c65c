//! Authentication configuration.
//!
//! All durations accept humantime strings when deserialized (`"1h"`,
//! `"30d"`, ...). A `timeout` of zero means login tokens never expire.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! token_style = "random-64"
//! timeout = "24h"
//! key_prefix = "satori"
//!
//! [auth.oauth2]
//! code_lifetime = "10m"
//! access_token_lifetime = "1h"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token generation styles.
///
/// Uniqueness of the randomized styles is probabilistic, not guaranteed;
/// collisions are accepted risk at the configured length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenStyle {
    /// Hyphenated UUID v4.
    Uuid,
    /// UUID v4 without hyphens (32 hex characters).
    Simple,
    /// 32 random alphanumeric characters.
    #[serde(rename = "random-32")]
    Random32,
    /// 64 random alphanumeric characters.
    #[serde(rename = "random-64")]
    Random64,
    /// 128 random alphanumeric characters.
    #[serde(rename = "random-128")]
    Random128,
    /// Signed JWT carrying the login id; requires `jwt_secret`.
    Jwt,
    /// SHA-256 hex digest over identity plus a random salt (64 characters).
    Hash,
    /// `{unix_millis}_{login_id}_{random}`, lexically sortable by issue time.
    Timestamp,
    /// Fixed 11-character alphanumeric short id.
    Tik,
}

/// Root configuration for the authentication core.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token name bindings use for the header/cookie carrying the token.
    /// The core treats it as an opaque hint.
    pub token_name: String,

    /// Token generation style.
    pub token_style: TokenStyle,

    /// Login token lifetime. Zero means tokens never expire.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Allow multiple concurrent logins per (identity, device).
    /// When false, a new login kicks out the previous token first.
    pub concurrent_login: bool,

    /// Extend a token's lifetime on successful `is_login` checks.
    /// Renewal is asynchronous and best-effort.
    pub auto_renew: bool,

    /// Prefix for every storage key this core writes.
    pub key_prefix: String,

    /// Secret for the `jwt` token style. Required by that style only.
    pub jwt_secret: Option<String>,

    /// Lifetime of anti-replay nonces.
    #[serde(with = "humantime_serde")]
    pub nonce_ttl: Duration,

    /// Refresh-token manager configuration.
    pub refresh: RefreshTokenConfig,

    /// OAuth2 authorization server configuration.
    pub oauth2: OAuth2Config,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_name: "satoken".to_string(),
            token_style: TokenStyle::Uuid,
            timeout: Duration::from_secs(30 * 24 * 3600), // 30 days
            concurrent_login: true,
            auto_renew: true,
            key_prefix: "satoken".to_string(),
            jwt_secret: None,
            nonce_ttl: Duration::from_secs(5 * 60),
            refresh: RefreshTokenConfig::default(),
            oauth2: OAuth2Config::default(),
        }
    }
}

impl AuthConfig {
    /// Sets the token style.
    #[must_use]
    pub fn with_token_style(mut self, style: TokenStyle) -> Self {
        self.token_style = style;
        self
    }

    /// Sets the login token lifetime.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the storage key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Sets the JWT signing secret.
    #[must_use]
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Sets whether concurrent multi-login per device is permitted.
    #[must_use]
    pub fn with_concurrent_login(mut self, concurrent: bool) -> Self {
        self.concurrent_login = concurrent;
        self
    }

    /// Sets whether tokens auto-renew on check.
    #[must_use]
    pub fn with_auto_renew(mut self, auto_renew: bool) -> Self {
        self.auto_renew = auto_renew;
        self
    }

    /// Login token expiration as the storage layer understands it:
    /// `None` when the configured timeout is zero (never expire).
    #[must_use]
    pub fn expiration(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }
}

/// Configuration for the refresh-token manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshTokenConfig {
    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime. Refresh tokens are not rotated on use, so
    /// this bounds how long a pair can keep renewing itself.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for RefreshTokenConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::from_secs(3600), // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
        }
    }
}

/// Configuration for the OAuth2 authorization server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuth2Config {
    /// Authorization code lifetime. Codes are single-use and short-lived.
    #[serde(with = "humantime_serde")]
    pub code_lifetime: Duration,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            code_lifetime: Duration::from_secs(600),          // 10 minutes
            access_token_lifetime: Duration::from_secs(3600), // 1 hour
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600), // 30 days
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.token_style, TokenStyle::Uuid);
        assert_eq!(config.key_prefix, "satoken");
        assert!(config.concurrent_login);
        assert!(config.auto_renew);
        assert_eq!(config.nonce_ttl, Duration::from_secs(300));
        assert_eq!(config.expiration(), Some(Duration::from_secs(30 * 24 * 3600)));
    }

    #[test]
    fn test_zero_timeout_means_no_expiry() {
        let config = AuthConfig::default().with_timeout(Duration::ZERO);
        assert_eq!(config.expiration(), None);
    }

    #[test]
    fn test_deserialize_humantime_and_style() {
        let config: AuthConfig = serde_json::from_str(
            r#"{
                "token_style": "random-64",
                "timeout": "24h",
                "key_prefix": "acme",
                "oauth2": { "code_lifetime": "5m" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.token_style, TokenStyle::Random64);
        assert_eq!(config.timeout, Duration::from_secs(86400));
        assert_eq!(config.key_prefix, "acme");
        assert_eq!(config.oauth2.code_lifetime, Duration::from_secs(300));
        // Untouched sections keep their defaults.
        assert_eq!(
            config.oauth2.access_token_lifetime,
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_builder_style_setters() {
        let config = AuthConfig::default()
            .with_token_style(TokenStyle::Hash)
            .with_jwt_secret("s3cret")
            .with_concurrent_login(false)
            .with_auto_renew(false);
        assert_eq!(config.token_style, TokenStyle::Hash);
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert!(!config.concurrent_login);
        assert!(!config.auto_renew);
    }
}
