//! # satori-storage-memory
//!
//! In-memory implementation of the Satori storage contract.
//!
//! Backed by a lock-free `papaya` hash map, so it is safe for concurrent
//! use from many tasks without a global lock. Expiry is enforced lazily:
//! expired entries are treated as absent on read and reclaimed when
//! touched, which matches the contract's "expired keys read as absent"
//! rule without a background sweeper.
//!
//! Intended for tests, demos, and single-process embeddings. Data does
//! not survive a restart.

mod storage;

pub use storage::MemoryStorage;
