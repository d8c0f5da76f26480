//! Content-addressed STT result cache
//!
//! Keys hash the audio content together with the request language and the
//! identity (name + config fingerprint) of the provider whose result would
//! be served. Including the producing provider avoids serving a cached
//! transcript produced under a different provider's configuration. Only
//! successful results are written; store failures degrade to cache misses.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use voice_orch_config::CacheSettings;
use voice_orch_core::SttResult;
use voice_orch_store::KeyValueStore;

/// Derive the cache key for one (audio, language, provider) combination
pub fn cache_key(
    audio: &[u8],
    language: Option<&str>,
    provider: &str,
    config_fingerprint: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update((audio.len() as u64).to_le_bytes());
    hasher.update(audio);
    hasher.update([0u8]);
    hasher.update(language.unwrap_or("auto").as_bytes());
    hasher.update([0u8]);
    hasher.update(provider.as_bytes());
    hasher.update([0u8]);
    hasher.update(config_fingerprint.as_bytes());
    format!("stt:{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct TranscriptCache {
    store: Arc<dyn KeyValueStore>,
    settings: CacheSettings,
}

impl TranscriptCache {
    pub fn new(store: Arc<dyn KeyValueStore>, settings: CacheSettings) -> Self {
        Self { store, settings }
    }

    pub fn enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Look up a cached transcript. Store or decode failures are treated
    /// as misses.
    pub async fn get(&self, key: &str) -> Option<SttResult> {
        if !self.settings.enabled {
            return None;
        }
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice::<SttResult>(&bytes) {
            Ok(result) => {
                tracing::debug!(key, provider = %result.provider, "cache hit");
                Some(result)
            }
            Err(err) => {
                tracing::warn!(key, error = %err, "cache entry corrupt, treating as miss");
                None
            }
        }
    }

    /// Write-through after a successful provider call. TTL is the agent's
    /// configured value clamped to [`CacheSettings::MAX_TTL`].
    pub async fn put(&self, key: &str, result: &SttResult) {
        if !self.settings.enabled {
            return;
        }
        let bytes = match serde_json::to_vec(result) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "cache entry serialization failed, skipping write");
                return;
            }
        };
        if let Err(err) = self.store.set(key, bytes, self.ttl()).await {
            tracing::warn!(error = %err, "cache write failed, continuing without caching");
        }
    }

    fn ttl(&self) -> Duration {
        self.settings.ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_orch_store::MemoryStore;

    fn cache(enabled: bool, ttl_secs: u64) -> TranscriptCache {
        TranscriptCache::new(
            Arc::new(MemoryStore::new()),
            CacheSettings { enabled, ttl_secs },
        )
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let cache = cache(true, 60);
        let result = SttResult::new("hello world", 0.92, "openai");
        let key = cache_key(b"audio-bytes", Some("en"), "openai", "openai|model=v2");

        cache.put(&key, &result).await;
        assert_eq!(cache.get(&key).await, Some(result));
    }

    #[tokio::test]
    async fn test_miss_until_written() {
        let cache = cache(true, 60);
        let key = cache_key(b"audio-bytes", None, "openai", "fp");
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_expiry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let cache = TranscriptCache::new(
            store,
            CacheSettings {
                enabled: true,
                ttl_secs: 0, // expires immediately
            },
        );
        let result = SttResult::new("gone", 0.5, "openai");
        let key = cache_key(b"x", None, "openai", "fp");
        cache.put(&key, &result).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache = cache(false, 60);
        let result = SttResult::new("hidden", 0.5, "openai");
        let key = cache_key(b"x", None, "openai", "fp");
        cache.put(&key, &result).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[test]
    fn test_key_depends_on_producing_provider() {
        let a = cache_key(b"same-audio", Some("en"), "openai", "fp");
        let b = cache_key(b"same-audio", Some("en"), "google", "fp");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_depends_on_config_fingerprint() {
        let a = cache_key(b"same-audio", Some("en"), "openai", "model=v1");
        let b = cache_key(b"same-audio", Some("en"), "openai", "model=v2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_depends_on_language() {
        let a = cache_key(b"same-audio", Some("en"), "openai", "fp");
        let b = cache_key(b"same-audio", None, "openai", "fp");
        assert_ne!(a, b);
    }
}
