//! Store traits
//!
//! Semantics mirror a Redis deployment: sorted-set-with-score windows,
//! TTL'd key-value entries, and hash-field counters under day-bucketed
//! keys.

use crate::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of one sliding-window admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDecision {
    /// Whether the request was admitted (and its timestamp recorded)
    pub admitted: bool,
    /// Admissions left in the current window after this decision
    pub remaining: u32,
    /// Time until the oldest recorded entry leaves the window
    pub reset_in: Duration,
}

/// Sliding-window timestamp set, one key per (agent, user) pair
#[async_trait]
pub trait WindowStore: Send + Sync + 'static {
    /// Atomically: prune entries older than `now_ms - window_ms`, count the
    /// remainder, and insert `now_ms` only if the count is below `max`.
    ///
    /// The whole sequence must be one atomic unit against the backend;
    /// two concurrent calls must never both observe "under limit" at
    /// `max - 1` entries and both insert.
    async fn try_admit(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        max: u32,
    ) -> Result<WindowDecision, StoreError>;

    /// Count entries currently inside the window without inserting
    async fn window_count(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
    ) -> Result<u32, StoreError>;

    /// Time until the oldest in-window entry expires, without inserting.
    /// Zero for an empty window.
    async fn window_reset_in(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
    ) -> Result<Duration, StoreError>;
}

/// TTL'd key-value storage for cached transcription results
#[async_trait]
pub trait KeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Insert or replace; the entry expires after `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Additive counter fields under a single key, for daily metric rollups
///
/// Increments must merge: concurrent writers to the same key add their
/// deltas rather than overwriting each other.
#[async_trait]
pub trait RollupStore: Send + Sync + 'static {
    async fn merge_counters(
        &self,
        key: &str,
        deltas: &[(String, i64)],
        ttl: Duration,
    ) -> Result<(), StoreError>;

    async fn read_counters(&self, key: &str) -> Result<HashMap<String, i64>, StoreError>;

    /// Keys starting with `prefix`, for aggregate reads
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
