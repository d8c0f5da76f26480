//! In-process store implementation
//!
//! Backs tests and single-node deployments. A mutex around each map gives
//! the same atomicity the traits demand from a networked backend.

use crate::traits::{KeyValueStore, RollupStore, WindowDecision, WindowStore};
use crate::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

#[derive(Default)]
pub struct MemoryStore {
    windows: Mutex<HashMap<String, VecDeque<u64>>>,
    kv: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
    rollups: Mutex<HashMap<String, HashMap<String, i64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WindowStore for MemoryStore {
    async fn try_admit(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
        max: u32,
    ) -> Result<WindowDecision, StoreError> {
        let mut windows = self.windows.lock();
        let entries = windows.entry(key.to_string()).or_default();

        let cutoff = now_ms.saturating_sub(window_ms);
        while entries.front().is_some_and(|&ts| ts <= cutoff) {
            entries.pop_front();
        }

        let count = entries.len() as u32;
        let admitted = count < max;
        if admitted {
            entries.push_back(now_ms);
        }

        let reset_in = entries
            .front()
            .map(|&oldest| Duration::from_millis((oldest + window_ms).saturating_sub(now_ms)))
            .unwrap_or(Duration::ZERO);

        Ok(WindowDecision {
            admitted,
            remaining: max.saturating_sub(entries.len() as u32),
            reset_in,
        })
    }

    async fn window_count(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
    ) -> Result<u32, StoreError> {
        let windows = self.windows.lock();
        let cutoff = now_ms.saturating_sub(window_ms);
        Ok(windows
            .get(key)
            .map(|entries| entries.iter().filter(|&&ts| ts > cutoff).count() as u32)
            .unwrap_or(0))
    }

    async fn window_reset_in(
        &self,
        key: &str,
        now_ms: u64,
        window_ms: u64,
    ) -> Result<Duration, StoreError> {
        let windows = self.windows.lock();
        let cutoff = now_ms.saturating_sub(window_ms);
        Ok(windows
            .get(key)
            .and_then(|entries| entries.iter().find(|&&ts| ts > cutoff))
            .map(|&oldest| Duration::from_millis((oldest + window_ms).saturating_sub(now_ms)))
            .unwrap_or(Duration::ZERO))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut kv = self.kv.lock();
        match kv.get(key) {
            Some((_, expires)) if *expires <= Instant::now() => {
                kv.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        self.kv
            .lock()
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.kv.lock().remove(key);
        Ok(())
    }
}

#[async_trait]
impl RollupStore for MemoryStore {
    async fn merge_counters(
        &self,
        key: &str,
        deltas: &[(String, i64)],
        _ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut rollups = self.rollups.lock();
        let fields = rollups.entry(key.to_string()).or_default();
        for (field, delta) in deltas {
            *fields.entry(field.clone()).or_insert(0) += delta;
        }
        Ok(())
    }

    async fn read_counters(&self, key: &str) -> Result<HashMap<String, i64>, StoreError> {
        Ok(self.rollups.lock().get(key).cloned().unwrap_or_default())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .rollups
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_window_admits_up_to_max() {
        let store = MemoryStore::new();
        for i in 0..3 {
            let d = store.try_admit("a:u", 1000 + i, 60_000, 3).await.unwrap();
            assert!(d.admitted, "request {} should be admitted", i);
        }
        let d = store.try_admit("a:u", 1004, 60_000, 3).await.unwrap();
        assert!(!d.admitted);
        assert_eq!(d.remaining, 0);
    }

    #[tokio::test]
    async fn test_window_prunes_expired_entries() {
        let store = MemoryStore::new();
        store.try_admit("a:u", 1000, 5000, 1).await.unwrap();
        // Inside the window: rejected
        let d = store.try_admit("a:u", 3000, 5000, 1).await.unwrap();
        assert!(!d.admitted);
        // Past the window: the old entry is pruned
        let d = store.try_admit("a:u", 6001, 5000, 1).await.unwrap();
        assert!(d.admitted);
    }

    #[tokio::test]
    async fn test_window_reset_in_tracks_oldest() {
        let store = MemoryStore::new();
        store.try_admit("a:u", 1000, 10_000, 5).await.unwrap();
        let d = store.try_admit("a:u", 4000, 10_000, 5).await.unwrap();
        // Oldest entry at 1000 leaves the window at 11_000
        assert_eq!(d.reset_in, Duration::from_millis(7000));
    }

    #[tokio::test]
    async fn test_window_reset_in_reads_without_inserting() {
        let store = MemoryStore::new();
        assert_eq!(
            store.window_reset_in("a:u", 1000, 10_000).await.unwrap(),
            Duration::ZERO
        );

        store.try_admit("a:u", 1000, 10_000, 5).await.unwrap();
        assert_eq!(
            store.window_reset_in("a:u", 4000, 10_000).await.unwrap(),
            Duration::from_millis(7000)
        );
        // The read added nothing to the window
        assert_eq!(store.window_count("a:u", 4000, 10_000).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_kv_roundtrip_and_expiry() {
        let store = MemoryStore::new();
        store
            .set("k", b"value".to_vec(), Duration::from_millis(30))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"value".to_vec()));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rollup_merges_additively() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store
            .merge_counters("m:agent:2026-08-28", &[("total".into(), 1)], ttl)
            .await
            .unwrap();
        store
            .merge_counters(
                "m:agent:2026-08-28",
                &[("total".into(), 1), ("success".into(), 1)],
                ttl,
            )
            .await
            .unwrap();

        let fields = store.read_counters("m:agent:2026-08-28").await.unwrap();
        assert_eq!(fields["total"], 2);
        assert_eq!(fields["success"], 1);
    }

    #[tokio::test]
    async fn test_list_keys_by_prefix() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        store
            .merge_counters("m:a1:2026-08-28", &[("total".into(), 1)], ttl)
            .await
            .unwrap();
        store
            .merge_counters("m:a2:2026-08-28", &[("total".into(), 1)], ttl)
            .await
            .unwrap();

        let keys = store.list_keys("m:a1").await.unwrap();
        assert_eq!(keys, vec!["m:a1:2026-08-28".to_string()]);
    }
}
