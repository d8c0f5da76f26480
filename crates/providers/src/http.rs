//! Shared plumbing for HTTP provider adapters
//!
//! Vendor wire formats are deliberately generic here: adapters POST the
//! payload to a configured endpoint and map transport/status failures onto
//! the engine's error taxonomy. The taxonomy drives retry/fallback
//! decisions, so the mapping is the part that matters.

use voice_orch_config::ProviderDescriptor;
use voice_orch_core::VoiceError;

/// Map an HTTP status to the error taxonomy.
///
/// 401/403 disqualify the provider for this request without retrying;
/// 408/429/5xx are transient and retried per policy; remaining 4xx mean
/// the provider rejected the payload itself.
pub(crate) fn classify_status(status: reqwest::StatusCode, provider: &str) -> VoiceError {
    match status.as_u16() {
        401 | 403 => VoiceError::Authentication(format!(
            "{} rejected credentials (HTTP {})",
            provider,
            status.as_u16()
        )),
        408 | 429 => VoiceError::Transient(format!(
            "{} throttled or timed out (HTTP {})",
            provider,
            status.as_u16()
        )),
        500..=599 => VoiceError::Transient(format!(
            "{} server error (HTTP {})",
            provider,
            status.as_u16()
        )),
        _ => VoiceError::AudioProcessing(format!(
            "{} rejected request (HTTP {})",
            provider,
            status.as_u16()
        )),
    }
}

/// Map a transport-level reqwest error; connection and timeout failures
/// are transient.
pub(crate) fn classify_transport(err: reqwest::Error, provider: &str) -> VoiceError {
    if err.is_timeout() || err.is_connect() {
        VoiceError::Transient(format!("{} unreachable: {}", provider, err))
    } else {
        VoiceError::Transient(format!("{} request failed: {}", provider, err))
    }
}

/// Resolve the descriptor's credential reference from the environment.
/// The reference names the variable; the secret itself never lives in
/// configuration.
pub(crate) fn resolve_credentials(descriptor: &ProviderDescriptor) -> Result<String, VoiceError> {
    let reference = descriptor.credentials_ref.as_deref().ok_or_else(|| {
        VoiceError::Configuration(format!(
            "provider '{}' has no credential reference",
            descriptor.name
        ))
    })?;
    std::env::var(reference).map_err(|_| {
        VoiceError::Configuration(format!(
            "credential reference '{}' for provider '{}' is not set",
            reference, descriptor.name
        ))
    })
}

/// Endpoint is mandatory for HTTP adapters
pub(crate) fn require_endpoint(descriptor: &ProviderDescriptor) -> Result<String, VoiceError> {
    descriptor
        .endpoint
        .clone()
        .ok_or_else(|| {
            VoiceError::Configuration(format!(
                "provider '{}' has no endpoint configured",
                descriptor.name
            ))
        })
        .map(|e| e.trim_end_matches('/').to_string())
}
