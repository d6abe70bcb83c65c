//! Security features layered on the storage adapter: anti-replay nonces
//! and access/refresh token pairs.

pub mod nonce;
pub mod refresh;

pub use nonce::NonceManager;
pub use refresh::{RefreshTokenInfo, RefreshTokenManager};
