//! Batching adapter for chunked audio input
//!
//! Some callers deliver audio in small chunks (websocket frames, telephony
//! packets) while most providers only take one complete payload. This
//! adapter accumulates chunks and flushes them as a single transcribe call
//! once a threshold is reached, and again on `finish()` for the remainder.
//! The state machine is explicit so buffering and flush-on-close behavior
//! are testable on their own.

use parking_lot::Mutex;
use std::sync::Arc;
use voice_orch_core::{Result, SttProvider, SttRequest, SttResult, VoiceError};

/// Adapter state, observable for tests and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No audio buffered yet
    Idle,
    /// Accumulating chunks below the flush threshold
    Buffering,
    /// `finish()` was called; no further chunks accepted
    Closed,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Buffered bytes that trigger a flush
    pub flush_threshold_bytes: usize,
    /// Remainders smaller than this are dropped at close instead of being
    /// sent (too short to transcribe meaningfully)
    pub min_flush_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            // ~1s of 16kHz PCM16
            flush_threshold_bytes: 32_000,
            min_flush_bytes: 3_200,
        }
    }
}

/// Accumulate → threshold → flush as one batched call
pub struct BatchingTranscriber {
    provider: Arc<dyn SttProvider>,
    /// Agent/user/language template applied to each flushed request
    template: SttRequest,
    config: BatchConfig,
    inner: Mutex<Inner>,
}

struct Inner {
    buffer: Vec<u8>,
    state: BatchState,
}

impl BatchingTranscriber {
    pub fn new(provider: Arc<dyn SttProvider>, template: SttRequest, config: BatchConfig) -> Self {
        Self {
            provider,
            template,
            config,
            inner: Mutex::new(Inner {
                buffer: Vec::new(),
                state: BatchState::Idle,
            }),
        }
    }

    pub fn state(&self) -> BatchState {
        self.inner.lock().state
    }

    pub fn buffered_bytes(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    /// Append one chunk. Returns a transcript when this chunk pushed the
    /// buffer over the flush threshold, `None` otherwise.
    pub async fn push_chunk(&self, chunk: &[u8]) -> Result<Option<SttResult>> {
        let batch = {
            let mut inner = self.inner.lock();
            if inner.state == BatchState::Closed {
                return Err(VoiceError::AudioProcessing(
                    "batching transcriber already closed".into(),
                ));
            }
            inner.buffer.extend_from_slice(chunk);
            inner.state = BatchState::Buffering;

            if inner.buffer.len() >= self.config.flush_threshold_bytes {
                Some(std::mem::take(&mut inner.buffer))
            } else {
                None
            }
        };

        match batch {
            Some(audio) => self.flush(audio).await.map(Some),
            None => Ok(None),
        }
    }

    /// Close the adapter and flush any remainder as the final batch.
    /// Returns `None` when the remainder was empty or below the minimum.
    pub async fn finish(&self) -> Result<Option<SttResult>> {
        let remainder = {
            let mut inner = self.inner.lock();
            inner.state = BatchState::Closed;
            std::mem::take(&mut inner.buffer)
        };

        if remainder.len() < self.config.min_flush_bytes {
            if !remainder.is_empty() {
                tracing::debug!(
                    bytes = remainder.len(),
                    "dropping sub-minimum remainder at close"
                );
            }
            return Ok(None);
        }
        self.flush(remainder).await.map(Some)
    }

    async fn flush(&self, audio: Vec<u8>) -> Result<SttResult> {
        tracing::debug!(bytes = audio.len(), "flushing batched audio");
        let mut request = self.template.clone();
        request.audio = audio;
        self.provider.transcribe(&request).await
    }
}
