//! Provider capability model
//!
//! Every provider adapter reports what it can consume and produce. The
//! coordinator queries this before dispatch (can the provider take this
//! format/language/size at all?) and validates results against it after a
//! successful call.

use crate::audio::AudioFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Quality tier requested by the caller / offered by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    #[default]
    Standard,
    Enhanced,
    Premium,
}

/// What a provider supports
///
/// Produced once by each provider instance and treated as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Audio formats the provider accepts (STT) or emits (TTS)
    pub formats: Vec<AudioFormat>,
    /// BCP-47-ish language codes; empty means "any"
    pub languages: Vec<String>,
    /// Maximum payload the provider accepts, in bytes
    pub max_payload_bytes: usize,
    /// Maximum audio duration the provider accepts
    pub max_duration: Duration,
    /// Quality tiers the provider can serve
    pub quality_tiers: Vec<QualityTier>,
    /// Provider can detect the spoken language itself
    pub language_detection: bool,
    /// Provider returns word-level timestamps
    pub word_timestamps: bool,
    /// Provider separates speakers
    pub diarization: bool,
    /// Sample rate the provider prefers for PCM/WAV input, if any
    pub preferred_sample_rate: Option<u32>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            formats: vec![AudioFormat::Wav, AudioFormat::Ogg, AudioFormat::Mp3],
            languages: Vec::new(),
            max_payload_bytes: 25 * 1024 * 1024,
            max_duration: Duration::from_secs(600),
            quality_tiers: vec![QualityTier::Standard],
            language_detection: false,
            word_timestamps: false,
            diarization: false,
            preferred_sample_rate: None,
        }
    }
}

impl Capabilities {
    pub fn supports_format(&self, format: AudioFormat) -> bool {
        self.formats.contains(&format)
    }

    /// Empty language list means the provider takes anything. A `None`
    /// (auto) request needs language detection support.
    pub fn supports_language(&self, language: Option<&str>) -> bool {
        match language {
            None => self.language_detection || self.languages.is_empty(),
            Some(lang) => {
                self.languages.is_empty() || self.languages.iter().any(|l| l == lang)
            }
        }
    }

    pub fn supports_tier(&self, tier: QualityTier) -> bool {
        self.quality_tiers.contains(&tier)
    }

    /// Validate payload size against the provider limit
    pub fn accepts_payload(&self, len: usize) -> bool {
        len <= self.max_payload_bytes
    }

    /// Validate audio duration against the provider limit
    pub fn accepts_duration(&self, duration: Duration) -> bool {
        duration <= self.max_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_language() {
        let caps = Capabilities {
            languages: vec!["en".into(), "hi".into()],
            language_detection: false,
            ..Default::default()
        };
        assert!(caps.supports_language(Some("en")));
        assert!(!caps.supports_language(Some("ru")));
        // auto requires detection when the list is restricted
        assert!(!caps.supports_language(None));
    }

    #[test]
    fn test_empty_language_list_means_any() {
        let caps = Capabilities::default();
        assert!(caps.supports_language(Some("anything")));
        assert!(caps.supports_language(None));
    }

    #[test]
    fn test_payload_limit() {
        let caps = Capabilities {
            max_payload_bytes: 10,
            ..Default::default()
        };
        assert!(caps.accepts_payload(10));
        assert!(!caps.accepts_payload(11));
    }

    #[test]
    fn test_duration_limit() {
        let caps = Capabilities {
            max_duration: Duration::from_secs(30),
            ..Default::default()
        };
        assert!(caps.accepts_duration(Duration::from_secs(30)));
        assert!(!caps.accepts_duration(Duration::from_secs(31)));
    }
}
