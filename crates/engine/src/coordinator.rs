//! Fallback coordinator
//!
//! Drives one request through the full state machine:
//! rate limit → cache lookup (STT only) → provider selection → ordered
//! attempts → success or aggregated failure. Provider attempts within a
//! request are strictly sequential; different requests run fully in
//! parallel on their own tasks. A caller that stops waiting cancels the
//! returned future and with it any in-flight attempt, so an overall
//! deadline is applied by wrapping the call in `tokio::time::timeout`.

use std::sync::Arc;
use std::time::Instant;
use voice_orch_config::{ProviderDescriptor, VoiceSettings};
use voice_orch_core::{
    AudioSink, ProviderFailure, Result, SttProvider, SttRequest, SttResult, TtsProvider,
    TtsRequest, TtsResult, VoiceError,
};
use voice_orch_store::{KeyValueStore, MemoryStore, RollupStore, WindowStore};

use crate::cache::{cache_key, TranscriptCache};
use crate::metrics::{AttemptRecord, MetricsCollector, OperationKind};
use crate::normalize::AudioNormalizer;
use crate::ratelimit::RateLimiter;
use crate::registry::ProviderRegistry;
use crate::retry::execute_with_retry;

/// The three shared-store handles the engine needs. In production all
/// three usually point at one Redis-like backend.
#[derive(Clone)]
pub struct SharedStores {
    pub window: Arc<dyn WindowStore>,
    pub kv: Arc<dyn KeyValueStore>,
    pub rollup: Arc<dyn RollupStore>,
}

impl SharedStores {
    /// Single in-process store backing all three roles
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            window: store.clone(),
            kv: store.clone(),
            rollup: store,
        }
    }
}

struct ActiveStt {
    descriptor: ProviderDescriptor,
    provider: Arc<dyn SttProvider>,
}

struct ActiveTts {
    descriptor: ProviderDescriptor,
    provider: Arc<dyn TtsProvider>,
}

/// Orchestrates STT/TTS calls across the configured fallback chain
pub struct VoiceCoordinator {
    settings: VoiceSettings,
    stt: Vec<ActiveStt>,
    tts: Vec<ActiveTts>,
    rate_limiter: RateLimiter,
    cache: TranscriptCache,
    normalizer: AudioNormalizer,
    metrics: MetricsCollector,
    sink: Option<Arc<dyn AudioSink>>,
}

impl VoiceCoordinator {
    /// Build the coordinator for one agent's settings.
    ///
    /// Providers are instantiated through the registry in priority order
    /// and initialized eagerly. A name with no registered constructor is a
    /// configuration fault and fails construction; a provider whose
    /// `initialize` fails is excluded from the chain but does not abort
    /// startup.
    pub async fn new(
        settings: VoiceSettings,
        registry: &ProviderRegistry,
        stores: SharedStores,
    ) -> Result<Self> {
        settings
            .validate()
            .map_err(|e| VoiceError::Configuration(e.to_string()))?;

        let mut stt = Vec::new();
        let mut tts = Vec::new();

        for descriptor in settings.active_providers() {
            if !registry.has_stt(&descriptor.name) && !registry.has_tts(&descriptor.name) {
                return Err(VoiceError::ProviderNotFound(descriptor.name.clone()));
            }

            if registry.has_stt(&descriptor.name) {
                let provider = registry.create_stt(descriptor)?;
                match provider.initialize().await {
                    Ok(()) => stt.push(ActiveStt {
                        descriptor: descriptor.clone(),
                        provider,
                    }),
                    Err(err) => tracing::warn!(
                        provider = %descriptor.name,
                        error = %err,
                        "stt provider failed to initialize, excluding from chain"
                    ),
                }
            }
            if registry.has_tts(&descriptor.name) {
                let provider = registry.create_tts(descriptor)?;
                match provider.initialize().await {
                    Ok(()) => tts.push(ActiveTts {
                        descriptor: descriptor.clone(),
                        provider,
                    }),
                    Err(err) => tracing::warn!(
                        provider = %descriptor.name,
                        error = %err,
                        "tts provider failed to initialize, excluding from chain"
                    ),
                }
            }
        }

        tracing::info!(
            stt_providers = stt.len(),
            tts_providers = tts.len(),
            "voice coordinator ready"
        );

        Ok(Self {
            rate_limiter: RateLimiter::new(stores.window, settings.rate_limit.clone()),
            cache: TranscriptCache::new(stores.kv, settings.cache.clone()),
            normalizer: AudioNormalizer::new(),
            metrics: MetricsCollector::new(stores.rollup),
            sink: None,
            settings,
            stt,
            tts,
        })
    }

    /// Attach a storage collaborator that persists TTS output
    pub fn with_sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Transcribe audio through the fallback chain.
    pub async fn transcribe(&self, request: SttRequest) -> Result<SttResult> {
        self.rate_limiter
            .check(&request.agent_id, &request.user_id)
            .await?;

        let candidates = ordered_by_hint(&self.stt, request.provider_hint.as_deref(), |c| {
            c.provider.name()
        });
        if candidates.is_empty() {
            return Err(VoiceError::Configuration(
                "no active STT providers configured".into(),
            ));
        }

        if self.cache.enabled() {
            for candidate in &candidates {
                let key = cache_key(
                    &request.audio,
                    request.language.as_deref(),
                    candidate.provider.name(),
                    &candidate.provider.config_fingerprint(),
                );
                if let Some(hit) = self.cache.get(&key).await {
                    metrics::counter!("voice_orch_cache_hits_total").increment(1);
                    return Ok(hit);
                }
            }
        }

        let mut attempts: Vec<ProviderFailure> = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let name = candidate.provider.name().to_string();
            let caps = candidate.provider.capabilities();

            if let Err(err) = validate_stt_request(&request, caps) {
                tracing::warn!(provider = %name, error = %err, "request rejected by capability check");
                self.record(&request.agent_id, &request.user_id, OperationKind::Stt, &name,
                    false, std::time::Duration::ZERO, request.audio.len(), 0,
                    Some(err.to_string()), index > 0)
                    .await;
                attempts.push(ProviderFailure { provider: name, error: err.to_string() });
                continue;
            }

            if !candidate.provider.health_check().await {
                tracing::warn!(provider = %name, "provider unhealthy, skipping");
                continue;
            }

            let normalized = self.normalizer.normalize(&request.audio, caps);
            let mut attempt_req = request.clone();
            attempt_req.audio = normalized.bytes;

            let started = Instant::now();
            let timeout = self.settings.attempt_timeout();
            let provider = candidate.provider.clone();
            let req_ref = &attempt_req;
            let operation = format!("stt:{}", name);

            let outcome = execute_with_retry(
                &operation,
                &candidate.descriptor.retry,
                VoiceError::is_retryable,
                move || {
                    let provider = provider.clone();
                    async move {
                        match tokio::time::timeout(timeout, provider.transcribe(req_ref)).await {
                            Ok(result) => result,
                            Err(_) => Err(VoiceError::Timeout {
                                ms: timeout.as_millis() as u64,
                            }),
                        }
                    }
                },
            )
            .await;

            let latency = started.elapsed();
            match outcome {
                Ok(mut result) => {
                    result.provider = name.clone();
                    result.processing_time = latency;

                    if let Err(err) = validate_stt_result(&result, caps) {
                        tracing::warn!(provider = %name, error = %err, "result failed capability validation");
                        self.record(&request.agent_id, &request.user_id, OperationKind::Stt,
                            &name, false, latency, request.audio.len(), 0,
                            Some(err.to_string()), index > 0)
                            .await;
                        attempts.push(ProviderFailure { provider: name, error: err.to_string() });
                        continue;
                    }

                    self.record(&request.agent_id, &request.user_id, OperationKind::Stt,
                        &name, true, latency, request.audio.len(), result.text.len(),
                        None, index > 0)
                        .await;

                    if self.cache.enabled() {
                        let key = cache_key(
                            &request.audio,
                            request.language.as_deref(),
                            &name,
                            &candidate.provider.config_fingerprint(),
                        );
                        self.cache.put(&key, &result).await;
                    }
                    return Ok(result);
                }
                Err(err) => {
                    self.record(&request.agent_id, &request.user_id, OperationKind::Stt,
                        &name, false, latency, request.audio.len(), 0,
                        Some(err.to_string()), index > 0)
                        .await;
                    attempts.push(ProviderFailure { provider: name, error: err.to_string() });
                }
            }
        }

        Err(VoiceError::AllFailed { attempts })
    }

    /// Synthesize text through the fallback chain. Output is handed to the
    /// storage collaborator when one is attached; it is never cached.
    pub async fn synthesize(&self, request: TtsRequest) -> Result<TtsResult> {
        self.rate_limiter
            .check(&request.agent_id, &request.user_id)
            .await?;

        let candidates = ordered_by_hint(&self.tts, request.provider_hint.as_deref(), |c| {
            c.provider.name()
        });
        if candidates.is_empty() {
            return Err(VoiceError::Configuration(
                "no active TTS providers configured".into(),
            ));
        }

        let mut attempts: Vec<ProviderFailure> = Vec::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let name = candidate.provider.name().to_string();
            let caps = candidate.provider.capabilities();

            if !caps.accepts_payload(request.text.len())
                || !caps.supports_tier(request.quality)
                || !caps.supports_format(request.output_format)
            {
                let err = VoiceError::AudioProcessing(format!(
                    "request ({} bytes, tier {:?}, output format {}) not accepted by provider",
                    request.text.len(),
                    request.quality,
                    request.output_format
                ));
                self.record(&request.agent_id, &request.user_id, OperationKind::Tts,
                    &name, false, std::time::Duration::ZERO, request.text.len(), 0,
                    Some(err.to_string()), index > 0)
                    .await;
                attempts.push(ProviderFailure { provider: name, error: err.to_string() });
                continue;
            }

            if !candidate.provider.health_check().await {
                tracing::warn!(provider = %name, "provider unhealthy, skipping");
                continue;
            }

            let started = Instant::now();
            let timeout = self.settings.attempt_timeout();
            let provider = candidate.provider.clone();
            let req_ref = &request;
            let operation = format!("tts:{}", name);

            let outcome = execute_with_retry(
                &operation,
                &candidate.descriptor.retry,
                VoiceError::is_retryable,
                move || {
                    let provider = provider.clone();
                    async move {
                        match tokio::time::timeout(timeout, provider.synthesize(req_ref)).await {
                            Ok(result) => result,
                            Err(_) => Err(VoiceError::Timeout {
                                ms: timeout.as_millis() as u64,
                            }),
                        }
                    }
                },
            )
            .await;

            let latency = started.elapsed();
            match outcome {
                Ok(mut result) => {
                    result.provider = name.clone();
                    result.processing_time = latency;

                    if !caps.supports_format(result.format) {
                        let err = VoiceError::AudioProcessing(format!(
                            "provider returned format {} outside its declared capabilities",
                            result.format
                        ));
                        self.record(&request.agent_id, &request.user_id, OperationKind::Tts,
                            &name, false, latency, request.text.len(), 0,
                            Some(err.to_string()), index > 0)
                            .await;
                        attempts.push(ProviderFailure { provider: name, error: err.to_string() });
                        continue;
                    }

                    if let Some(sink) = &self.sink {
                        match sink
                            .persist(&request.agent_id, &result.audio, result.format.extension())
                            .await
                        {
                            Ok(reference) => result.storage_ref = Some(reference),
                            Err(err) => {
                                // Storage is best-effort; the caller still
                                // gets the audio bytes.
                                tracing::warn!(error = %err, "audio sink persist failed");
                            }
                        }
                    }

                    self.record(&request.agent_id, &request.user_id, OperationKind::Tts,
                        &name, true, latency, request.text.len(), result.audio.len(),
                        None, index > 0)
                        .await;
                    return Ok(result);
                }
                Err(err) => {
                    self.record(&request.agent_id, &request.user_id, OperationKind::Tts,
                        &name, false, latency, request.text.len(), 0,
                        Some(err.to_string()), index > 0)
                        .await;
                    attempts.push(ProviderFailure { provider: name, error: err.to_string() });
                }
            }
        }

        Err(VoiceError::AllFailed { attempts })
    }

    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        agent_id: &str,
        user_id: &str,
        operation: OperationKind,
        provider: &str,
        success: bool,
        latency: std::time::Duration,
        request_bytes: usize,
        response_bytes: usize,
        error: Option<String>,
        fallback: bool,
    ) {
        self.metrics
            .record_attempt(&AttemptRecord {
                agent_id: agent_id.to_string(),
                user_id: user_id.to_string(),
                operation,
                provider: provider.to_string(),
                success,
                latency,
                request_bytes,
                response_bytes,
                error,
                fallback_used: fallback,
            })
            .await;
    }
}

/// Priority order with an optional caller hint promoted to the front
fn ordered_by_hint<'a, T>(
    providers: &'a [T],
    hint: Option<&str>,
    name_of: impl Fn(&T) -> &str,
) -> Vec<&'a T> {
    let mut out: Vec<&T> = providers.iter().collect();
    if let Some(hint) = hint {
        if let Some(pos) = out.iter().position(|c| name_of(c) == hint) {
            let promoted = out.remove(pos);
            out.insert(0, promoted);
        }
    }
    out
}

fn validate_stt_request(
    request: &SttRequest,
    caps: &voice_orch_core::Capabilities,
) -> Result<()> {
    if !caps.accepts_payload(request.audio.len()) {
        return Err(VoiceError::AudioProcessing(format!(
            "audio of {} bytes exceeds provider limit of {} bytes",
            request.audio.len(),
            caps.max_payload_bytes
        )));
    }
    // Duration is only derivable for decodable containers; compressed
    // payloads are length-checked above and duration-checked by the
    // provider itself.
    if let Some(duration) = crate::normalize::wav_duration(&request.audio) {
        if !caps.accepts_duration(duration) {
            return Err(VoiceError::AudioProcessing(format!(
                "audio of {:.1}s exceeds provider limit of {:.1}s",
                duration.as_secs_f64(),
                caps.max_duration.as_secs_f64()
            )));
        }
    }
    if !caps.supports_language(request.language.as_deref()) {
        return Err(VoiceError::AudioProcessing(format!(
            "language {:?} not supported by provider",
            request.language
        )));
    }
    if !caps.supports_tier(request.quality) {
        return Err(VoiceError::AudioProcessing(format!(
            "quality tier {:?} not offered by provider",
            request.quality
        )));
    }
    Ok(())
}

fn validate_stt_result(
    result: &SttResult,
    caps: &voice_orch_core::Capabilities,
) -> Result<()> {
    if let Some(language) = &result.language {
        if !caps.supports_language(Some(language)) && !caps.language_detection {
            return Err(VoiceError::AudioProcessing(format!(
                "provider reported language '{}' outside its declared capabilities",
                language
            )));
        }
    }
    Ok(())
}
