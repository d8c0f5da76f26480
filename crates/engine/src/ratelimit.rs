//! Per-user sliding-window rate limiter
//!
//! Admission is one atomic trim+count+insert against the shared
//! [`WindowStore`], so concurrent requests for the same (agent, user) pair
//! can never both sneak in at the limit. Store failures fail open:
//! infrastructure hiccups must not block voice processing.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use voice_orch_config::RateLimitSettings;
use voice_orch_core::{Result, VoiceError};
use voice_orch_store::WindowStore;

/// Successful admission, with observability hints for the caller
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    /// Requests left in the current window
    pub remaining: u32,
    /// Time until the oldest window entry expires
    pub reset_in: Duration,
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn WindowStore>,
    settings: RateLimitSettings,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn WindowStore>, settings: RateLimitSettings) -> Self {
        Self { store, settings }
    }

    fn key(agent_id: &str, user_id: &str) -> String {
        format!("rl:{}:{}", agent_id, user_id)
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Admit or reject one request for (agent, user).
    ///
    /// Returns `RateLimited` with a retry-after hint when the window is
    /// full. A store error admits the request and logs.
    pub async fn check(&self, agent_id: &str, user_id: &str) -> Result<Admission> {
        if !self.settings.enabled {
            return Ok(Admission {
                remaining: self.settings.max_requests,
                reset_in: Duration::ZERO,
            });
        }

        let key = Self::key(agent_id, user_id);
        let window_ms = self.settings.window().as_millis() as u64;

        match self
            .store
            .try_admit(&key, Self::now_ms(), window_ms, self.settings.max_requests)
            .await
        {
            Ok(decision) if decision.admitted => Ok(Admission {
                remaining: decision.remaining,
                reset_in: decision.reset_in,
            }),
            Ok(decision) => {
                tracing::info!(
                    agent_id,
                    user_id,
                    retry_after_ms = decision.reset_in.as_millis() as u64,
                    "rate limit exceeded"
                );
                Err(VoiceError::RateLimited {
                    retry_after: decision.reset_in,
                })
            }
            Err(err) => {
                tracing::warn!(
                    agent_id,
                    user_id,
                    error = %err,
                    "rate limiter store failure, failing open"
                );
                Ok(Admission {
                    remaining: self.settings.max_requests,
                    reset_in: Duration::ZERO,
                })
            }
        }
    }

    /// Requests left in the current window, without consuming one
    pub async fn remaining_requests(&self, agent_id: &str, user_id: &str) -> u32 {
        let key = Self::key(agent_id, user_id);
        let window_ms = self.settings.window().as_millis() as u64;
        match self.store.window_count(&key, Self::now_ms(), window_ms).await {
            Ok(count) => self.settings.max_requests.saturating_sub(count),
            Err(err) => {
                tracing::warn!(error = %err, "rate limiter store failure reading count");
                self.settings.max_requests
            }
        }
    }

    /// Time until the oldest in-window entry expires, without consuming a
    /// request. Zero when the window is empty or the limiter is disabled.
    pub async fn reset_in(&self, agent_id: &str, user_id: &str) -> Duration {
        if !self.settings.enabled {
            return Duration::ZERO;
        }
        let key = Self::key(agent_id, user_id);
        let window_ms = self.settings.window().as_millis() as u64;
        match self
            .store
            .window_reset_in(&key, Self::now_ms(), window_ms)
            .await
        {
            Ok(reset_in) => reset_in,
            Err(err) => {
                tracing::warn!(error = %err, "rate limiter store failure reading reset hint");
                Duration::ZERO
            }
        }
    }
}
