//! Voice provider orchestration engine
//!
//! Library layer invoked by the surrounding agent runtime. Ties together
//! the provider registry, retry/backoff executor, audio normalizer,
//! sliding-window rate limiter, content-addressed result cache, and the
//! fallback coordinator that drives a request through them.

pub mod batch;
pub mod cache;
pub mod coordinator;
pub mod metrics;
pub mod normalize;
pub mod ratelimit;
pub mod registry;
pub mod retry;

pub use batch::{BatchConfig, BatchState, BatchingTranscriber};
pub use cache::{cache_key, TranscriptCache};
pub use coordinator::{SharedStores, VoiceCoordinator};
pub use metrics::{
    AttemptRecord, DailyStats, MetricsCollector, OperationKind, ProviderStats, SystemMetrics,
};
pub use normalize::{wav_duration, AudioNormalizer, NormalizedAudio};
pub use ratelimit::{Admission, RateLimiter};
pub use registry::{ProviderRegistry, SttConstructor, TtsConstructor};
pub use retry::execute_with_retry;
