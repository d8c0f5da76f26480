//! Typed settings for the voice provider orchestration engine
//!
//! The surrounding agent runtime resolves its nested per-agent config tree
//! into one [`VoiceSettings`] value and passes it in by value; the engine
//! never digs through untyped config maps itself.

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    CacheSettings, ProviderDescriptor, RateLimitSettings, RetryPolicy, VoiceSettings,
};
