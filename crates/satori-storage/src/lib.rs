//! # satori-storage
//!
//! Expiring key-value storage contract for the Satori authentication core.
//!
//! Every other Satori component persists through the [`KvStorage`] trait,
//! so the core can back onto memory, a cache, or a database without code
//! changes. The contract is intentionally small:
//!
//! - values are a closed set of variants ([`StorageValue`]), validated at
//!   the boundary instead of downcast on read
//! - expiry is storage-enforced; an expired key reads as absent
//! - `keys` supports a trailing-`*` glob only, enough to enumerate the
//!   device-scoped keys of one identity
//!
//! # Implementations
//!
//! - `satori-storage-memory` - lock-free in-memory backend
//!
//! Implementations must be safe for concurrent use by many callers and
//! must guarantee read-after-write visibility for a single caller.
//! Cross-replica consistency is the backend's responsibility.

pub mod error;
pub mod traits;
pub mod value;

pub use error::{StorageError, StorageResult};
pub use traits::{KeyTtl, KvStorage};
pub use value::StorageValue;
