//! Generic HTTP TTS adapter
//!
//! Mirrors the STT adapter: one REST shape parameterized by descriptor.
//! The request goes up as JSON, the synthesized audio comes back as the
//! raw response body.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use voice_orch_config::ProviderDescriptor;
use voice_orch_core::{
    Capabilities, Result, TtsProvider, TtsRequest, TtsResult, VoiceProvider,
};

use crate::http::{classify_status, classify_transport, resolve_credentials, require_endpoint};

/// Synthesis request body
#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    rate: f32,
    pitch: f32,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

pub struct HttpTtsProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: Option<String>,
    default_voice: Option<String>,
    capabilities: Capabilities,
    client: reqwest::Client,
}

impl HttpTtsProvider {
    pub fn from_descriptor(
        descriptor: &ProviderDescriptor,
        capabilities: Capabilities,
    ) -> Result<Self> {
        let endpoint = require_endpoint(descriptor)?;
        let api_key = resolve_credentials(descriptor)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                voice_orch_core::VoiceError::Configuration(format!(
                    "failed to build HTTP client for '{}': {}",
                    descriptor.name, e
                ))
            })?;

        Ok(Self {
            name: descriptor.name.clone(),
            endpoint,
            api_key,
            model: descriptor.setting_str("model").map(str::to_string),
            default_voice: descriptor.setting_str("voice").map(str::to_string),
            capabilities,
            client,
        })
    }
}

#[async_trait]
impl VoiceProvider for HttpTtsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(provider = %self.name, error = %err, "health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl TtsProvider for HttpTtsProvider {
    async fn synthesize(&self, request: &TtsRequest) -> Result<TtsResult> {
        let url = format!("{}/synthesize", self.endpoint);
        let body = SynthesizeBody {
            text: &request.text,
            voice: request.voice_id.as_deref().or(self.default_voice.as_deref()),
            rate: request.speaking_rate,
            pitch: request.pitch,
            format: request.output_format.extension(),
            model: self.model.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(e, &self.name))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &self.name));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| {
                voice_orch_core::VoiceError::Transient(format!(
                    "{} response body truncated: {}",
                    self.name, e
                ))
            })?
            .to_vec();

        Ok(TtsResult {
            audio,
            format: request.output_format,
            processing_time: Duration::ZERO,
            provider: self.name.clone(),
            storage_ref: None,
            metadata: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_endpoint_rejected() {
        let mut d = ProviderDescriptor::new("google", 0);
        d.credentials_ref = Some("TEST_TTS_KEY".into());
        assert!(matches!(
            HttpTtsProvider::from_descriptor(&d, Capabilities::default()),
            Err(voice_orch_core::VoiceError::Configuration(_))
        ));
    }

    #[test]
    fn test_default_voice_from_settings() {
        std::env::set_var("TEST_TTS_KEY", "secret");
        let mut d = ProviderDescriptor::new("google", 0);
        d.endpoint = Some("https://tts.example.com".into());
        d.credentials_ref = Some("TEST_TTS_KEY".into());
        d.settings
            .insert("voice".into(), serde_json::json!("alloy"));

        let provider = HttpTtsProvider::from_descriptor(&d, Capabilities::default()).unwrap();
        assert_eq!(provider.default_voice.as_deref(), Some("alloy"));
    }
}
