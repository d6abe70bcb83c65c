//! JWT encoding and decoding for the `jwt` token style.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;

/// Claims carried by a `jwt`-style login token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginClaims {
    /// The login id.
    pub sub: String,

    /// Device the token was issued for.
    pub device: String,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiry, unix seconds.
    pub exp: i64,
}

/// HS256 encoder/decoder bound to one secret.
#[derive(Clone)]
pub struct JwtCodec {
    secret: String,
}

impl JwtCodec {
    /// Creates a codec for the given signing secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Signs the claims into a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if signing fails.
    pub fn encode(&self, claims: &LoginClaims) -> AuthResult<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| AuthError::configuration(format!("jwt signing failed: {err}")))
    }

    /// Verifies signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTokenData` if the token is malformed, the
    /// signature does not verify, or the token has expired.
    pub fn decode(&self, token: &str) -> AuthResult<LoginClaims> {
        decode::<LoginClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|err| AuthError::invalid_token_data(err.to_string()))
    }
}
