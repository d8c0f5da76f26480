//! Error taxonomy for the orchestration engine
//!
//! The retry executor and fallback coordinator make control-flow decisions
//! off these variants, so the classification lives here rather than in
//! vendor-specific exception types: transient failures are retried, fatal
//! ones disqualify the provider for the current request, and `AllFailed`
//! aggregates the terminal error of every attempted provider.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our error
pub type Result<T> = std::result::Result<T, VoiceError>;

/// One provider's terminal failure inside an [`VoiceError::AllFailed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Provider name, as registered
    pub provider: String,
    /// Last error observed for that provider, rendered
    pub error: String,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.error)
    }
}

/// Main error type for voice provider orchestration
#[derive(Error, Debug)]
pub enum VoiceError {
    /// Missing or invalid provider configuration. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No constructor registered under the requested name
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// Provider is disabled or failed to initialize; skipped, does not
    /// count against the fallback budget
    #[error("provider not available: {0}")]
    ProviderNotAvailable(String),

    /// Bad input audio: oversize, too long, or unsupported format after
    /// normalization. Fatal for the current provider.
    #[error("audio processing error: {0}")]
    AudioProcessing(String),

    /// Per-user sliding window exhausted; no provider was attempted
    #[error("rate limit exceeded, retry in {retry_after:?}")]
    RateLimited {
        /// Hint until the oldest window entry expires
        retry_after: Duration,
    },

    /// Timeouts, connection failures, HTTP 429/503-class responses.
    /// Retried per the provider's RetryPolicy.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Credential rejection. Disqualifies the provider for this request
    /// without retrying; other providers are still attempted.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Attempt deadline elapsed; treated like a transient failure
    #[error("operation timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Shared store (rate limiter / cache / metrics) failure
    #[error("store error: {0}")]
    Store(String),

    /// Every candidate provider was exhausted
    #[error("all providers failed: [{}]", format_attempts(.attempts))]
    AllFailed { attempts: Vec<ProviderFailure> },

    /// Retry budget exhausted for a single operation
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<VoiceError>,
    },
}

fn format_attempts(attempts: &[ProviderFailure]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl VoiceError {
    /// Should the retry executor try again after this error?
    ///
    /// Only transport-level hiccups qualify. Authentication, configuration
    /// and audio errors will not get better on the next attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VoiceError::Transient(_) | VoiceError::Timeout { .. })
    }

    /// Does this error end the whole request (vs. one provider attempt)?
    pub fn is_request_fatal(&self) -> bool {
        matches!(
            self,
            VoiceError::RateLimited { .. } | VoiceError::Configuration(_)
        )
    }

    /// Errors that should not consume a slot in the fallback error list
    pub fn is_skip(&self) -> bool {
        matches!(self, VoiceError::ProviderNotAvailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(VoiceError::Transient("503".into()).is_retryable());
        assert!(VoiceError::Timeout { ms: 100 }.is_retryable());
        assert!(!VoiceError::Authentication("bad key".into()).is_retryable());
        assert!(!VoiceError::Configuration("missing".into()).is_retryable());
        assert!(!VoiceError::AudioProcessing("oversize".into()).is_retryable());
    }

    #[test]
    fn test_all_failed_names_every_provider() {
        let err = VoiceError::AllFailed {
            attempts: vec![
                ProviderFailure {
                    provider: "yandex".into(),
                    error: "operation timed out after 5000ms".into(),
                },
                ProviderFailure {
                    provider: "openai".into(),
                    error: "authentication error: key revoked".into(),
                },
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("yandex"));
        assert!(rendered.contains("openai"));
        assert!(rendered.contains("timed out"));
    }
}
