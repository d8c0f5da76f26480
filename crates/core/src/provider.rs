//! Provider traits
//!
//! Every vendor adapter implements one of these. There is no inheritance
//! hierarchy: a provider is whatever satisfies the trait, and the registry
//! hands out trait objects. Adding a vendor means one new adapter plus one
//! registration call.

use crate::capabilities::Capabilities;
use crate::error::Result;
use crate::request::{SttRequest, SttResult, TtsRequest, TtsResult};
use async_trait::async_trait;

/// Lifecycle and capability contract common to STT and TTS providers
///
/// Implementations must be safe for concurrent use; one instance is shared
/// across all in-flight requests for an agent.
#[async_trait]
pub trait VoiceProvider: Send + Sync + 'static {
    /// Registered provider name (unique per registry)
    fn name(&self) -> &str;

    /// What this provider supports; read-only after construction
    fn capabilities(&self) -> &Capabilities;

    /// Acquire connections / validate credentials before first use
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Release any held resources
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Cheap liveness probe; unhealthy providers are skipped by the
    /// coordinator without consuming a fallback slot
    async fn health_check(&self) -> bool {
        true
    }
}

/// Speech-to-text provider
#[async_trait]
pub trait SttProvider: VoiceProvider {
    /// Transcribe one audio payload
    async fn transcribe(&self, request: &SttRequest) -> Result<SttResult>;

    /// Fingerprint of the effective configuration, mixed into cache keys.
    /// Two instances with different credentials/models must differ.
    fn config_fingerprint(&self) -> String {
        self.name().to_string()
    }
}

/// Text-to-speech provider
#[async_trait]
pub trait TtsProvider: VoiceProvider {
    /// Synthesize one text payload
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResult>;
}

/// Storage collaborator that persists synthesized audio and returns a
/// stable reference (bucket+key or URL). The engine never implements
/// storage itself.
#[async_trait]
pub trait AudioSink: Send + Sync + 'static {
    async fn persist(&self, agent_id: &str, audio: &[u8], extension: &str) -> Result<String>;
}
