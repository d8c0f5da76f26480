//! Shared store abstractions for the orchestration engine
//!
//! The rate limiter, result cache, and metrics rollups all sit on an
//! externally shared store (a Redis-like service in production). The engine
//! only depends on these traits; [`MemoryStore`] backs tests and
//! single-node deployments. Atomicity requirements live in the store
//! operation itself rather than in client-side locking, because several
//! engine processes may share one backend.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, RollupStore, WindowDecision, WindowStore};
