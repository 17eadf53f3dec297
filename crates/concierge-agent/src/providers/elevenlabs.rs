//! ElevenLabs HTTP text-to-speech client.
//!
//! One `POST /v1/text-to-speech/{voice_id}/stream` per synthesis request;
//! the whole clip comes back in a single response body as raw PCM in the
//! configured output format.

use crate::error::AgentError;
use crate::providers::TextToSpeech;
use async_trait::async_trait;
use concierge_types::TtsConfig;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_MODEL: &str = "eleven_turbo_v2_5";
pub const DEFAULT_OUTPUT_FORMAT: &str = "pcm_24000";

#[derive(Debug, Serialize)]
struct SynthesisRequest {
    text: String,
    model_id: String,
}

/// HTTP synthesis against the ElevenLabs API.
#[derive(Debug, Clone)]
pub struct ElevenLabsTts {
    api_key: String,
    voice_id: String,
    model: String,
    output_format: String,
    sample_rate: u32,
    base_url: String,
    client: reqwest::Client,
}

impl ElevenLabsTts {
    pub fn new(api_key: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            model: DEFAULT_MODEL.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            sample_rate: sample_rate_for_format(DEFAULT_OUTPUT_FORMAT),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    pub fn from_config(config: &TtsConfig, api_key: &str) -> Self {
        Self::new(api_key, &config.voice_id)
            .with_model(&config.model)
            .with_output_format(&config.output_format)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the output format and the sample rate implied by it.
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self.sample_rate = sample_rate_for_format(&self.output_format);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl TextToSpeech for ElevenLabsTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AgentError> {
        let url = format!(
            "{}/v1/text-to-speech/{}/stream?output_format={}",
            self.base_url, self.voice_id, self.output_format
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&SynthesisRequest {
                text: text.to_string(),
                model_id: self.model.clone(),
            })
            .send()
            .await
            .map_err(|e| AgentError::Tts(format!("request to ElevenLabs failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "unknown".to_string());
            return Err(AgentError::Tts(format!(
                "ElevenLabs API returned status {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| AgentError::Tts(format!("failed to read audio response: {e}")))?;
        debug!(
            voice_id = %self.voice_id,
            audio_bytes = audio.len(),
            "received synthesized audio"
        );
        Ok(audio.to_vec())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Derives the sample rate from an output format such as `pcm_24000`.
fn sample_rate_for_format(format: &str) -> u32 {
    format
        .split('_')
        .nth(1)
        .and_then(|rate| rate.parse().ok())
        .unwrap_or(24_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_follows_output_format() {
        let tts = ElevenLabsTts::new("xi_test", "EXAVITQu4vr4xnSDxMaL");
        assert_eq!(tts.sample_rate(), 24_000);

        let tts = tts.with_output_format("pcm_16000");
        assert_eq!(tts.sample_rate(), 16_000);
    }

    #[test]
    fn unknown_format_falls_back_to_24khz() {
        assert_eq!(sample_rate_for_format("ulaw"), 24_000);
        assert_eq!(sample_rate_for_format("pcm_x"), 24_000);
    }

    #[test]
    fn from_config_applies_voice_and_model() {
        let config = TtsConfig::default();
        let tts = ElevenLabsTts::from_config(&config, "xi_test");
        assert_eq!(tts.voice_id(), "EXAVITQu4vr4xnSDxMaL");
        assert_eq!(tts.model(), "eleven_turbo_v2_5");
        assert_eq!(tts.sample_rate(), 24_000);
    }

    #[test]
    fn synthesis_request_serializes_model_id() {
        let request = SynthesisRequest {
            text: "Hello".to_string(),
            model_id: DEFAULT_MODEL.to_string(),
        };
        let encoded = serde_json::to_value(&request).unwrap();
        assert_eq!(encoded["text"], "Hello");
        assert_eq!(encoded["model_id"], "eleven_turbo_v2_5");
    }
}
