//! Core traits and types for the voice provider orchestration engine
//!
//! This crate provides foundational types used across all other crates:
//! - Provider traits (STT, TTS, lifecycle, audio persistence)
//! - Audio format detection
//! - Capability model
//! - Request/result value types
//! - Error taxonomy

pub mod audio;
pub mod capabilities;
pub mod error;
pub mod provider;
pub mod request;

pub use audio::{detect_format, AudioFormat};
pub use capabilities::{Capabilities, QualityTier};
pub use error::{ProviderFailure, Result, VoiceError};
pub use provider::{AudioSink, SttProvider, TtsProvider, VoiceProvider};
pub use request::{SttRequest, SttResult, TtsRequest, TtsResult};
