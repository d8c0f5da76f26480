//! Built-in HTTP provider adapters
//!
//! Ships one generic REST adapter per operation kind plus capability
//! presets for the vendors we deploy against. `register_builtin` wires the
//! presets into a registry; the composition root can register additional
//! or replacement constructors on top.

mod http;
mod stt;
mod tts;

pub use stt::HttpSttProvider;
pub use tts::HttpTtsProvider;

use std::sync::Arc;
use std::time::Duration;
use voice_orch_core::{AudioFormat, Capabilities, QualityTier, SttProvider, TtsProvider};
use voice_orch_engine::ProviderRegistry;

/// Capability preset for a known vendor name. Unknown names get the
/// conservative default so a custom deployment still works out of the box.
pub fn vendor_capabilities(name: &str) -> Capabilities {
    match name {
        "openai" => Capabilities {
            formats: vec![
                AudioFormat::Wav,
                AudioFormat::Ogg,
                AudioFormat::Mp3,
                AudioFormat::Flac,
            ],
            languages: Vec::new(),
            max_payload_bytes: 25 * 1024 * 1024,
            max_duration: Duration::from_secs(1500),
            quality_tiers: vec![QualityTier::Standard, QualityTier::Enhanced],
            language_detection: true,
            word_timestamps: true,
            diarization: false,
            preferred_sample_rate: None,
        },
        "google" => Capabilities {
            formats: vec![AudioFormat::Wav, AudioFormat::Ogg, AudioFormat::Flac],
            languages: Vec::new(),
            max_payload_bytes: 10 * 1024 * 1024,
            max_duration: Duration::from_secs(480),
            quality_tiers: vec![
                QualityTier::Standard,
                QualityTier::Enhanced,
                QualityTier::Premium,
            ],
            language_detection: true,
            word_timestamps: true,
            diarization: true,
            preferred_sample_rate: Some(16_000),
        },
        "yandex" => Capabilities {
            formats: vec![AudioFormat::Ogg, AudioFormat::Pcm16],
            languages: vec!["ru".into(), "en".into(), "tr".into(), "kk".into()],
            max_payload_bytes: 1024 * 1024,
            max_duration: Duration::from_secs(30),
            quality_tiers: vec![QualityTier::Standard],
            language_detection: false,
            word_timestamps: false,
            diarization: false,
            preferred_sample_rate: Some(16_000),
        },
        _ => Capabilities::default(),
    }
}

/// Register the built-in HTTP adapters under their vendor names.
pub fn register_builtin(registry: &mut ProviderRegistry) {
    for name in ["openai", "google", "yandex"] {
        registry.register_stt(name, move |descriptor| {
            let caps = vendor_capabilities(&descriptor.name);
            Ok(Arc::new(HttpSttProvider::from_descriptor(descriptor, caps)?)
                as Arc<dyn SttProvider>)
        });
        registry.register_tts(name, move |descriptor| {
            let caps = vendor_capabilities(&descriptor.name);
            Ok(Arc::new(HttpTtsProvider::from_descriptor(descriptor, caps)?)
                as Arc<dyn TtsProvider>)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_registered() {
        let mut registry = ProviderRegistry::new();
        register_builtin(&mut registry);
        for name in ["openai", "google", "yandex"] {
            assert!(registry.has_stt(name));
            assert!(registry.has_tts(name));
        }
    }

    #[test]
    fn test_unknown_vendor_gets_default_preset() {
        let caps = vendor_capabilities("selfhosted");
        assert!(caps.supports_format(AudioFormat::Wav));
    }

    #[test]
    fn test_yandex_preset_is_restricted() {
        let caps = vendor_capabilities("yandex");
        assert!(!caps.supports_format(AudioFormat::Mp3));
        assert!(!caps.supports_language(None));
        assert!(caps.supports_language(Some("ru")));
    }
}
