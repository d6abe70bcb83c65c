//! # satori-auth
//!
//! An embeddable authentication core: it issues and validates login
//! tokens, manages per-identity sessions, enforces permission/role
//! authorization with wildcard patterns, and runs a self-contained
//! OAuth2 authorization-code server, all on top of the pluggable
//! expiring key-value contract from `satori-storage`.
//!
//! The core performs no network I/O, parses no HTTP, and persists
//! nothing itself: persistence is delegated entirely to the storage
//! adapter, and request/response marshaling belongs to framework
//! bindings built on [`RequestGuard`].
//!
//! ## Modules
//!
//! - [`manager`] - the login/session/authorization orchestrator
//! - [`config`] - configuration and token styles
//! - [`token`] - token generation strategies
//! - [`session`] - per-identity session store
//! - [`permission`] - wildcard permission matching
//! - [`security`] - anti-replay nonces and refresh-token pairs
//! - [`oauth2`] - the OAuth2 authorization server
//! - [`binding`] - the capability trait framework bindings implement
//! - [`error`] - the error taxonomy
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use satori_auth::{Manager, TokenStyle};
//! use satori_storage_memory::MemoryStorage;
//!
//! let manager = Manager::builder(Arc::new(MemoryStorage::new()))
//!     .token_style(TokenStyle::Random64)
//!     .timeout(std::time::Duration::from_secs(86_400))
//!     .build();
//!
//! let token = manager.login("user1000", None).await?;
//! assert!(manager.is_login(&token).await);
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod manager;
pub mod oauth2;
pub mod permission;
pub mod security;
pub mod session;
pub mod token;

pub use binding::RequestGuard;
pub use config::{AuthConfig, OAuth2Config, RefreshTokenConfig, TokenStyle};
pub use error::{AuthError, ErrorCategory};
pub use manager::{DEFAULT_DEVICE, Manager, ManagerBuilder, TokenInfo};
pub use oauth2::{AuthorizationCode, OAuth2AccessToken, OAuth2Client, OAuth2GrantType, OAuth2Server};
pub use security::{NonceManager, RefreshTokenInfo, RefreshTokenManager};
pub use session::Session;
pub use token::TokenGenerator;

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use satori_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::binding::RequestGuard;
    pub use crate::config::{AuthConfig, OAuth2Config, RefreshTokenConfig, TokenStyle};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::manager::{DEFAULT_DEVICE, Manager, ManagerBuilder, TokenInfo};
    pub use crate::oauth2::{
        AuthorizationCode, OAuth2AccessToken, OAuth2Client, OAuth2GrantType, OAuth2Server,
    };
    pub use crate::security::{NonceManager, RefreshTokenInfo, RefreshTokenManager};
    pub use crate::session::Session;
    pub use crate::token::TokenGenerator;
}
