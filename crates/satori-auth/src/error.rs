//! Authentication and authorization error types.
//!
//! Every failure the core can report is a distinct, inspectable kind so
//! embedding adapters can map it to a transport status deterministically.
//! Business-rule failures are returned, never panicked.

use std::fmt;

use satori_storage::StorageError;

/// Errors that can occur during authentication and authorization operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The account has an active disable record and cannot log in.
    #[error("Account is disabled")]
    AccountDisabled,

    /// The presented token does not correspond to a live login.
    #[error("Not logged in")]
    NotLogin,

    /// No token mapping exists for the given token or identity.
    #[error("Token not found")]
    TokenNotFound,

    /// The token mapping exists but its stored content is malformed.
    #[error("Invalid token data: {message}")]
    InvalidTokenData {
        /// Description of the malformed content.
        message: String,
    },

    /// The refresh token is unknown, expired, or revoked.
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    /// The identity lacks the required permission.
    #[error("Permission denied: {permission}")]
    PermissionDenied {
        /// The permission that was required.
        permission: String,
    },

    /// The identity lacks the required role.
    #[error("Role denied: {role}")]
    RoleDenied {
        /// The role that was required.
        role: String,
    },

    /// The client is not registered to use the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The unsupported grant type.
        grant_type: String,
    },

    /// The client is unregistered or its credentials do not match.
    #[error("Invalid client: {message}")]
    InvalidClient {
        /// Description of why the client is invalid.
        message: String,
    },

    /// The authorization code is unknown, expired, or already consumed.
    #[error("Invalid authorization code: {message}")]
    InvalidCode {
        /// Description of why the code is invalid.
        message: String,
    },

    /// The redirect URI is not registered for the client or does not
    /// match the code's binding.
    #[error("Invalid redirect URI: {uri}")]
    InvalidRedirectUri {
        /// The offending redirect URI.
        uri: String,
    },

    /// An error occurred while storing or retrieving auth data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid for the requested operation.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `InvalidTokenData` error.
    #[must_use]
    pub fn invalid_token_data(message: impl Into<String>) -> Self {
        Self::InvalidTokenData {
            message: message.into(),
        }
    }

    /// Creates a new `PermissionDenied` error.
    #[must_use]
    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    /// Creates a new `RoleDenied` error.
    #[must_use]
    pub fn role_denied(role: impl Into<String>) -> Self {
        Self::RoleDenied { role: role.into() }
    }

    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `InvalidClient` error.
    #[must_use]
    pub fn invalid_client(message: impl Into<String>) -> Self {
        Self::InvalidClient {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidCode` error.
    #[must_use]
    pub fn invalid_code(message: impl Into<String>) -> Self {
        Self::InvalidCode {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRedirectUri` error.
    #[must_use]
    pub fn invalid_redirect_uri(uri: impl Into<String>) -> Self {
        Self::InvalidRedirectUri { uri: uri.into() }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an authentication error (identity
    /// verification failed).
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::AccountDisabled
                | Self::NotLogin
                | Self::TokenNotFound
                | Self::InvalidTokenData { .. }
                | Self::InvalidRefreshToken
        )
    }

    /// Returns `true` if this is an authorization error (permission or
    /// role check failed).
    #[must_use]
    pub fn is_authorization_error(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::RoleDenied { .. }
        )
    }

    /// Returns `true` if this is a server-side error rather than a
    /// business-rule failure.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Configuration { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AccountDisabled => ErrorCategory::Authentication,
            Self::NotLogin => ErrorCategory::Authentication,
            Self::TokenNotFound => ErrorCategory::Token,
            Self::InvalidTokenData { .. } => ErrorCategory::Token,
            Self::InvalidRefreshToken => ErrorCategory::Token,
            Self::PermissionDenied { .. } => ErrorCategory::Authorization,
            Self::RoleDenied { .. } => ErrorCategory::Authorization,
            Self::UnsupportedGrantType { .. } => ErrorCategory::OAuth2,
            Self::InvalidClient { .. } => ErrorCategory::OAuth2,
            Self::InvalidCode { .. } => ErrorCategory::OAuth2,
            Self::InvalidRedirectUri { .. } => ErrorCategory::OAuth2,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns the OAuth 2.0 error code for this error, for adapters
    /// serving the OAuth2 endpoints.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidCode { .. } => "invalid_grant",
            Self::InvalidRedirectUri { .. } => "invalid_request",
            Self::InvalidRefreshToken => "invalid_grant",
            Self::TokenNotFound | Self::InvalidTokenData { .. } => "invalid_token",
            Self::NotLogin | Self::AccountDisabled => "access_denied",
            Self::PermissionDenied { .. } | Self::RoleDenied { .. } => "access_denied",
            Self::Storage { .. } | Self::Configuration { .. } => "server_error",
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::storage(err.to_string())
    }
}

/// Categories of authentication/authorization errors for logging and
/// monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Authentication-related errors (identity verification).
    Authentication,
    /// Authorization-related errors (permission/role checks).
    Authorization,
    /// Token-related errors (lookup, content, refresh).
    Token,
    /// OAuth2 grant-flow errors.
    OAuth2,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::OAuth2 => write!(f, "oauth2"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
