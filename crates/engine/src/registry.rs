//! Provider registry
//!
//! Maps a provider name to a constructor. The registry is an explicit
//! value owned by the composition root and injected into the coordinator;
//! there is no process-wide singleton, so tests register fakes freely.

use std::collections::HashMap;
use std::sync::Arc;
use voice_orch_config::ProviderDescriptor;
use voice_orch_core::{Result, SttProvider, TtsProvider, VoiceError};

/// Constructor for an STT provider instance
pub type SttConstructor =
    Arc<dyn Fn(&ProviderDescriptor) -> Result<Arc<dyn SttProvider>> + Send + Sync>;

/// Constructor for a TTS provider instance
pub type TtsConstructor =
    Arc<dyn Fn(&ProviderDescriptor) -> Result<Arc<dyn TtsProvider>> + Send + Sync>;

/// Name → constructor lookup for both operation kinds
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    stt: HashMap<String, SttConstructor>,
    tts: HashMap<String, TtsConstructor>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_stt<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(&ProviderDescriptor) -> Result<Arc<dyn SttProvider>> + Send + Sync + 'static,
    {
        self.stt.insert(name.into(), Arc::new(ctor));
    }

    pub fn register_tts<F>(&mut self, name: impl Into<String>, ctor: F)
    where
        F: Fn(&ProviderDescriptor) -> Result<Arc<dyn TtsProvider>> + Send + Sync + 'static,
    {
        self.tts.insert(name.into(), Arc::new(ctor));
    }

    /// Instantiate the STT provider named by the descriptor
    pub fn create_stt(&self, descriptor: &ProviderDescriptor) -> Result<Arc<dyn SttProvider>> {
        let ctor = self
            .stt
            .get(&descriptor.name)
            .ok_or_else(|| VoiceError::ProviderNotFound(descriptor.name.clone()))?;
        ctor(descriptor)
    }

    /// Instantiate the TTS provider named by the descriptor
    pub fn create_tts(&self, descriptor: &ProviderDescriptor) -> Result<Arc<dyn TtsProvider>> {
        let ctor = self
            .tts
            .get(&descriptor.name)
            .ok_or_else(|| VoiceError::ProviderNotFound(descriptor.name.clone()))?;
        ctor(descriptor)
    }

    pub fn has_stt(&self, name: &str) -> bool {
        self.stt.contains_key(name)
    }

    pub fn has_tts(&self, name: &str) -> bool {
        self.tts.contains_key(name)
    }

    /// Registered STT provider names, for diagnostics
    pub fn stt_names(&self) -> Vec<&str> {
        self.stt.keys().map(String::as_str).collect()
    }

    pub fn tts_names(&self) -> Vec<&str> {
        self.tts.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("stt", &self.stt.keys().collect::<Vec<_>>())
            .field("tts", &self.tts.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use voice_orch_core::{Capabilities, SttRequest, SttResult, VoiceProvider};

    struct NullStt {
        caps: Capabilities,
    }

    #[async_trait]
    impl VoiceProvider for NullStt {
        fn name(&self) -> &str {
            "null"
        }
        fn capabilities(&self) -> &Capabilities {
            &self.caps
        }
    }

    #[async_trait]
    impl SttProvider for NullStt {
        async fn transcribe(&self, _request: &SttRequest) -> Result<SttResult> {
            Ok(SttResult::new("", 0.0, "null"))
        }
    }

    #[test]
    fn test_create_registered_provider() {
        let mut registry = ProviderRegistry::new();
        registry.register_stt("null", |_d| {
            Ok(Arc::new(NullStt {
                caps: Capabilities::default(),
            }) as Arc<dyn SttProvider>)
        });

        let descriptor = ProviderDescriptor::new("null", 0);
        assert!(registry.create_stt(&descriptor).is_ok());
    }

    #[test]
    fn test_unknown_name_is_typed_error() {
        let registry = ProviderRegistry::new();
        let descriptor = ProviderDescriptor::new("nope", 0);
        match registry.create_stt(&descriptor) {
            Err(VoiceError::ProviderNotFound(name)) => assert_eq!(name, "nope"),
            other => panic!("expected ProviderNotFound, got {:?}", other.map(|_| ())),
        }
    }
}
