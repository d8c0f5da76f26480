//! STT/TTS request and result value types
//!
//! Requests are constructed once per call and never mutated afterwards.
//! Results are produced by a provider adapter; a successful `SttResult`
//! becomes the cache value as-is.

use crate::audio::AudioFormat;
use crate::capabilities::QualityTier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Speech-to-text request
#[derive(Debug, Clone)]
pub struct SttRequest {
    /// Agent whose provider configuration governs this call
    pub agent_id: String,
    /// End user, for rate limiting
    pub user_id: String,
    /// Raw audio bytes as received from the caller
    pub audio: Vec<u8>,
    /// Declared language; `None` means auto-detect
    pub language: Option<String>,
    /// Requested quality tier
    pub quality: QualityTier,
    /// Move this provider to the front of the fallback chain
    pub provider_hint: Option<String>,
    /// Provider-specific pass-through parameters
    pub params: HashMap<String, serde_json::Value>,
}

impl SttRequest {
    pub fn new(
        agent_id: impl Into<String>,
        user_id: impl Into<String>,
        audio: Vec<u8>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            user_id: user_id.into(),
            audio,
            language: None,
            quality: QualityTier::default(),
            provider_hint: None,
            params: HashMap::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_hint(mut self, provider: impl Into<String>) -> Self {
        self.provider_hint = Some(provider.into());
        self
    }
}

/// Speech-to-text result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SttResult {
    /// Transcript text
    pub text: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
    /// Language the provider detected (or echoed back)
    pub language: Option<String>,
    /// Wall-clock time the provider took
    pub processing_time: Duration,
    /// Word count of the transcript
    pub word_count: usize,
    /// Name of the provider that produced this result
    pub provider: String,
    /// Provider-specific extras (timestamps, diarization, ...)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SttResult {
    /// Build a result, deriving the word count from the text
    pub fn new(text: impl Into<String>, confidence: f32, provider: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count();
        Self {
            text,
            confidence: confidence.clamp(0.0, 1.0),
            language: None,
            processing_time: Duration::ZERO,
            word_count,
            provider: provider.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Text-to-speech request
#[derive(Debug, Clone)]
pub struct TtsRequest {
    pub agent_id: String,
    pub user_id: String,
    /// Text to synthesize
    pub text: String,
    /// Provider voice identifier; `None` picks the provider default
    pub voice_id: Option<String>,
    /// Speaking rate multiplier, 1.0 = normal
    pub speaking_rate: f32,
    /// Pitch shift in semitones, 0.0 = normal
    pub pitch: f32,
    /// Desired output container
    pub output_format: AudioFormat,
    pub quality: QualityTier,
    pub provider_hint: Option<String>,
    pub params: HashMap<String, serde_json::Value>,
}

impl TtsRequest {
    pub fn new(
        agent_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            user_id: user_id.into(),
            text: text.into(),
            voice_id: None,
            speaking_rate: 1.0,
            pitch: 0.0,
            output_format: AudioFormat::Ogg,
            quality: QualityTier::default(),
            provider_hint: None,
            params: HashMap::new(),
        }
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }
}

/// Text-to-speech result
#[derive(Debug, Clone)]
pub struct TtsResult {
    /// Synthesized audio bytes
    pub audio: Vec<u8>,
    /// Container the bytes are in
    pub format: AudioFormat,
    /// Wall-clock time the provider took
    pub processing_time: Duration,
    /// Name of the provider that produced this result
    pub provider: String,
    /// Stable reference assigned by the storage collaborator, if persisted
    pub storage_ref: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}
