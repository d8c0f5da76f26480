//! Retry/backoff executor
//!
//! One generic implementation wraps every provider call in the engine;
//! per-vendor retry loops do not exist. The policy comes from the
//! provider's configuration, the classifier from the error taxonomy.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use voice_orch_config::RetryPolicy;
use voice_orch_core::{Result, VoiceError};

/// Delay before retry number `attempt` (0-based), jitter included.
///
/// `base * multiplier^attempt`, capped at `max_delay`, plus a uniform
/// jitter fraction so simultaneous failures don't retry in lockstep.
fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exp = policy.base_delay().as_secs_f64() * policy.multiplier.powi(attempt as i32);
    let capped = exp.min(policy.max_delay().as_secs_f64());

    let jitter_frac = if policy.jitter_max_frac > policy.jitter_min_frac {
        rand::thread_rng().gen_range(policy.jitter_min_frac..=policy.jitter_max_frac)
    } else {
        policy.jitter_min_frac
    };

    Duration::from_secs_f64(capped * (1.0 + jitter_frac))
}

/// Run `attempt_fn` up to `policy.max_attempts` times.
///
/// Errors the classifier marks non-retryable abort immediately and
/// propagate unchanged. When the budget is exhausted the last error is
/// wrapped in [`VoiceError::RetriesExhausted`] naming the operation and
/// attempt count.
pub async fn execute_with_retry<T, F, Fut, C>(
    operation: &str,
    policy: &RetryPolicy,
    classify_retryable: C,
    mut attempt_fn: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    C: Fn(&VoiceError) -> bool,
{
    let mut last_error = None;

    for attempt in 0..policy.max_attempts {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(err) if !classify_retryable(&err) => {
                tracing::debug!(
                    operation,
                    attempt,
                    error = %err,
                    "fatal error, aborting retry loop"
                );
                return Err(err);
            }
            Err(err) => {
                let is_last = attempt + 1 == policy.max_attempts;
                tracing::warn!(
                    operation,
                    attempt,
                    error = %err,
                    "attempt failed{}",
                    if is_last { ", budget exhausted" } else { ", will retry" }
                );
                last_error = Some(err);
                if !is_last {
                    tokio::time::sleep(backoff_delay(policy, attempt)).await;
                }
            }
        }
    }

    Err(VoiceError::RetriesExhausted {
        operation: operation.to_string(),
        attempts: policy.max_attempts,
        source: Box::new(
            last_error.unwrap_or_else(|| VoiceError::Transient("no attempts executed".into())),
        ),
    })
}
