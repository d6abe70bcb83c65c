//! OAuth2 domain types.

use serde::{Deserialize, Serialize};

/// OAuth 2.0 grant types a client can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuth2GrantType {
    /// Authorization-code grant.
    AuthorizationCode,
    /// Refresh-token grant.
    RefreshToken,
    /// Client-credentials grant (registrable; the built-in server only
    /// drives the code and refresh flows).
    ClientCredentials,
}

impl OAuth2GrantType {
    /// The wire name of the grant type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

/// A registered OAuth2 client.
///
/// Registered once, looked up by id on every grant. Re-registering the
/// same `client_id` overwrites the previous registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Client {
    /// Public client identifier.
    pub client_id: String,

    /// Shared secret presented on token-endpoint calls.
    pub client_secret: String,

    /// Redirect URIs the client may use. Authorization requests naming
    /// any other URI are rejected.
    pub redirect_uris: Vec<String>,

    /// Grant types the client may use.
    pub grant_types: Vec<OAuth2GrantType>,

    /// Scopes the client may request.
    pub scopes: Vec<String>,
}

impl OAuth2Client {
    /// Returns `true` if `uri` is one of the registered redirect URIs.
    #[must_use]
    pub fn allows_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|registered| registered == uri)
    }

    /// Returns `true` if the client is registered for `grant`.
    #[must_use]
    pub fn allows_grant(&self, grant: OAuth2GrantType) -> bool {
        self.grant_types.contains(&grant)
    }
}

/// A single-use authorization code bound to one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    /// The code value handed to the client via redirect.
    pub code: String,

    /// Client the code was issued to.
    pub client_id: String,

    /// Redirect URI the code is bound to; the exchange must present the
    /// same one.
    pub redirect_uri: String,

    /// Resource owner who approved the request.
    pub user_id: String,

    /// Approved scopes.
    pub scopes: Vec<String>,

    /// Unix seconds at which the code expires.
    pub expire_time: i64,
}

/// An issued OAuth2 access token and its binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2AccessToken {
    /// The bearer token value.
    pub token: String,

    /// Token type, always `"Bearer"`.
    pub token_type: String,

    /// Resource owner the token acts for.
    pub user_id: String,

    /// Client the token was issued to.
    pub client_id: String,

    /// Granted scopes.
    pub scopes: Vec<String>,

    /// Access token lifetime in seconds, as issued.
    pub expires_in: i64,

    /// Paired refresh token.
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OAuth2Client {
        OAuth2Client {
            client_id: "webapp".to_string(),
            client_secret: "secret123".to_string(),
            redirect_uris: vec!["http://localhost:8080/callback".to_string()],
            grant_types: vec![
                OAuth2GrantType::AuthorizationCode,
                OAuth2GrantType::RefreshToken,
            ],
            scopes: vec!["read".to_string(), "write".to_string()],
        }
    }

    #[test]
    fn test_redirect_uri_check_is_exact() {
        let client = client();
        assert!(client.allows_redirect_uri("http://localhost:8080/callback"));
        assert!(!client.allows_redirect_uri("http://localhost:8080/callback/"));
        assert!(!client.allows_redirect_uri("http://evil.example/callback"));
    }

    #[test]
    fn test_grant_type_check() {
        let client = client();
        assert!(client.allows_grant(OAuth2GrantType::AuthorizationCode));
        assert!(!client.allows_grant(OAuth2GrantType::ClientCredentials));
        assert_eq!(
            OAuth2GrantType::AuthorizationCode.as_str(),
            "authorization_code"
        );
    }

    #[test]
    fn test_client_serde_round_trip() {
        let client = client();
        let json = serde_json::to_string(&client).unwrap();
        assert!(json.contains("\"authorization_code\""));
        let back: OAuth2Client = serde_json::from_str(&json).unwrap();
        assert_eq!(back, client);
    }
}
