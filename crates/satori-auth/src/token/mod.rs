//! Token generation.
//!
//! The generator is stateless given a configuration: pure computation
//! plus a random source, no I/O. Style semantics are described on
//! [`crate::config::TokenStyle`].

pub mod generator;
pub mod jwt;

pub use generator::TokenGenerator;
pub use jwt::{JwtCodec, LoginClaims};
