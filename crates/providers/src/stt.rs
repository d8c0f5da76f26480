//! Generic HTTP STT adapter
//!
//! One adapter serves every REST-style transcription vendor: the payload
//! goes up as a raw body with language/model headers, the transcript comes
//! back as JSON. Per-vendor differences live entirely in the descriptor
//! (endpoint, credential reference, settings) and the capability preset
//! chosen at registration.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use voice_orch_config::ProviderDescriptor;
use voice_orch_core::{
    Capabilities, Result, SttProvider, SttRequest, SttResult, VoiceProvider,
};

use crate::http::{classify_status, classify_transport, resolve_credentials, require_endpoint};

/// Transcription response body
#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    language: Option<String>,
}

pub struct HttpSttProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: Option<String>,
    capabilities: Capabilities,
    client: reqwest::Client,
}

impl HttpSttProvider {
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
            capabilities,
            client,
        })
    }
}

#[async_trait]
impl VoiceProvider for HttpSttProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                tracing::warn!(
                    provider = %self.name,
                    status = resp.status().as_u16(),
                    "health check returned non-success, proceeding anyway"
                );
                true
            }
            Err(err) => {
                tracing::warn!(provider = %self.name, error = %err, "health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl SttProvider for HttpSttProvider {
    async fn transcribe(&self, request: &SttRequest) -> Result<SttResult> {
        let format = voice_orch_core::detect_format(&request.audio);
        let url = format!("{}/transcribe", self.endpoint);

        let mut builder = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", format.mime())
            .header("X-Language", request.language.as_deref().unwrap_or("auto"));
        if let Some(model) = &self.model {
            builder = builder.header("X-Model", model);
        }

        let response = builder
            .body(request.audio.clone())
            .send()
            .await
            .map_err(|e| classify_transport(e, &self.name))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, &self.name));
        }

        let body: TranscribeResponse = response.json().await.map_err(|e| {
            voice_orch_core::VoiceError::Transient(format!(
                "{} returned unparseable response: {}",
                self.name, e
            ))
        })?;

        let mut result = SttResult::new(body.text, body.confidence.unwrap_or(1.0), &self.name);
        result.language = body.language.or_else(|| request.language.clone());
        Ok(result)
    }

    fn config_fingerprint(&self) -> String {
        format!(
            "{}|{}|model={}",
            self.name,
            self.endpoint,
            self.model.as_deref().unwrap_or("default")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> ProviderDescriptor {
        let mut d = ProviderDescriptor::new(name, 0);
        d.endpoint = Some("https://stt.example.com/v1/".into());
        d.credentials_ref = Some("TEST_STT_KEY".into());
        d
    }

    #[test]
    fn test_from_descriptor_resolves_credentials() {
        std::env::set_var("TEST_STT_KEY", "secret");
        let provider =
            HttpSttProvider::from_descriptor(&descriptor("openai"), Capabilities::default())
                .unwrap();
        assert_eq!(provider.name(), "openai");
        // Trailing slash trimmed from the endpoint
        assert_eq!(provider.endpoint, "https://stt.example.com/v1");
    }

    #[test]
    fn test_missing_credentials_env_is_configuration_error() {
        let mut d = descriptor("openai");
        d.credentials_ref = Some("DEFINITELY_UNSET_VAR_12345".into());
        assert!(matches!(
            HttpSttProvider::from_descriptor(&d, Capabilities::default()),
            Err(voice_orch_core::VoiceError::Configuration(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_model() {
        std::env::set_var("TEST_STT_KEY", "secret");
        let mut with_model = descriptor("openai");
        with_model
            .settings
            .insert("model".into(), serde_json::json!("whisper-large"));

        let a = HttpSttProvider::from_descriptor(&descriptor("openai"), Capabilities::default())
            .unwrap();
        let b =
            HttpSttProvider::from_descriptor(&with_model, Capabilities::default()).unwrap();
        assert_ne!(a.config_fingerprint(), b.config_fingerprint());
    }
}
