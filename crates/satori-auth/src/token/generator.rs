//! Token value generation for all configured styles.

use std::time::Duration;

use rand::{Rng, distributions::Alphanumeric};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::{AuthConfig, TokenStyle};
use crate::error::AuthError;
use crate::token::jwt::{JwtCodec, LoginClaims};

/// Length of the `tik` short-id style.
const TIK_LEN: usize = 11;

/// Exp horizon for JWTs when the configured timeout is zero (tokens
/// never expire, but the claim set still needs a bound).
const JWT_NO_TIMEOUT_EXP: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Produces token values according to the configured style.
///
/// Generation never touches storage; every style is pure computation
/// plus the thread-local random source.
#[derive(Clone)]
pub struct TokenGenerator {
    style: TokenStyle,
    jwt_secret: Option<String>,
    timeout: Duration,
}

impl TokenGenerator {
    /// Creates a generator from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            style: config.token_style,
            jwt_secret: config.jwt_secret.clone(),
            timeout: config.timeout,
        }
    }

    /// Generates a token value for `(login_id, device)`.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error when the `jwt` style is selected
    /// without a secret.
    pub fn generate(&self, login_id: &str, device: &str) -> AuthResult<String> {
        match self.style {
            TokenStyle::Uuid => Ok(Uuid::new_v4().to_string()),
            TokenStyle::Simple => Ok(Uuid::new_v4().simple().to_string()),
            TokenStyle::Random32 => Ok(random_alphanumeric(32)),
            TokenStyle::Random64 => Ok(random_alphanumeric(64)),
            TokenStyle::Random128 => Ok(random_alphanumeric(128)),
            TokenStyle::Jwt => self.generate_jwt(login_id, device),
            TokenStyle::Hash => Ok(Self::generate_hash(login_id, device)),
            TokenStyle::Timestamp => Ok(Self::generate_timestamp(login_id)),
            TokenStyle::Tik => Ok(random_alphanumeric(TIK_LEN)),
        }
    }

    fn generate_jwt(&self, login_id: &str, device: &str) -> AuthResult<String> {
        let secret = self.jwt_secret.as_deref().ok_or_else(|| {
            AuthError::configuration("jwt token style requires a jwt_secret")
        })?;

        let lifetime = if self.timeout.is_zero() {
            JWT_NO_TIMEOUT_EXP
        } else {
            self.timeout
        };
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = LoginClaims {
            sub: login_id.to_string(),
            device: device.to_string(),
            iat: now,
            exp: now + lifetime.as_secs() as i64,
        };
        JwtCodec::new(secret).encode(&claims)
    }

    /// 64 hex characters; the random salt makes two calls for the same
    /// identity produce different tokens.
    fn generate_hash(login_id: &str, device: &str) -> String {
        let salt = random_alphanumeric(16);
        let mut hasher = Sha256::new();
        hasher.update(login_id.as_bytes());
        hasher.update(b":");
        hasher.update(device.as_bytes());
        hasher.update(b":");
        hasher.update(salt.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// `{unix_millis}_{login_id}_{random}`, lexically sortable by issue
    /// time.
    fn generate_timestamp(login_id: &str) -> String {
        let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        format!("{millis}_{login_id}_{}", random_alphanumeric(6))
    }
}

fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(style: TokenStyle) -> TokenGenerator {
        TokenGenerator::new(
            &AuthConfig::default()
                .with_token_style(style)
                .with_jwt_secret("test-secret-key"),
        )
    }

    #[test]
    fn test_hash_style_is_64_hex_and_salted() {
        let generator = generator(TokenStyle::Hash);
        let token1 = generator.generate("user1000", "default").unwrap();
        let token2 = generator.generate("user1000", "default").unwrap();

        assert_eq!(token1.len(), 64);
        assert!(token1.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_tik_style_is_11_alphanumeric() {
        let generator = generator(TokenStyle::Tik);
        let token = generator.generate("user1000", "default").unwrap();

        assert_eq!(token.len(), TIK_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_timestamp_style_layout() {
        let generator = generator(TokenStyle::Timestamp);
        let token = generator.generate("user1000", "default").unwrap();

        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[1], "user1000");
        assert_eq!(parts[2].len(), 6);
    }

    #[test]
    fn test_simple_style_is_32_hex() {
        let generator = generator(TokenStyle::Simple);
        let token = generator.generate("user1000", "default").unwrap();
        assert_eq!(token.len(), 32);
        assert!(!token.contains('-'));
    }

    #[test]
    fn test_random_styles_have_configured_length() {
        for (style, len) in [
            (TokenStyle::Random32, 32),
            (TokenStyle::Random64, 64),
            (TokenStyle::Random128, 128),
        ] {
            let token = generator(style).generate("user1000", "default").unwrap();
            assert_eq!(token.len(), len);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_jwt_style_requires_secret() {
        let generator = TokenGenerator::new(
            &AuthConfig::default().with_token_style(TokenStyle::Jwt),
        );
        let err = generator.generate("user1000", "default").unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }

    #[test]
    fn test_jwt_style_round_trips_identity() {
        let generator = generator(TokenStyle::Jwt);
        let token = generator.generate("user1000", "app").unwrap();
        let claims = JwtCodec::new("test-secret-key").decode(&token).unwrap();
        assert_eq!(claims.sub, "user1000");
        assert_eq!(claims.device, "app");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_all_styles_produce_distinct_nonempty_tokens() {
        for style in [
            TokenStyle::Uuid,
            TokenStyle::Simple,
            TokenStyle::Random32,
            TokenStyle::Random64,
            TokenStyle::Random128,
            TokenStyle::Jwt,
            TokenStyle::Hash,
            TokenStyle::Timestamp,
            TokenStyle::Tik,
        ] {
            let generator = generator(style);
            let token1 = generator.generate("user1000", "default").unwrap();
            let token2 = generator.generate("user1001", "default").unwrap();
            assert!(!token1.is_empty());
            assert_ne!(token1, token2);
        }
    }
}
