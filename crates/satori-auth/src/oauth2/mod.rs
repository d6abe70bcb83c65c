//! Self-contained OAuth2 authorization-code server.
//!
//! Client registry plus the authorization-code → access-token → refresh
//! lifecycle, with its own token namespace independent of the main login
//! tokens.

pub mod server;
pub mod types;

pub use server::OAuth2Server;
pub use types::{AuthorizationCode, OAuth2AccessToken, OAuth2Client, OAuth2GrantType};
