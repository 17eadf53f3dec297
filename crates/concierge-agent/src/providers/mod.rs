//! Pipeline capability seams and their concrete provider clients.
//!
//! A session talks to three external capabilities through the traits below;
//! the fourth (voice-activity detection) is evaluated locally by
//! [`vad::SpeechGate`]. Concrete clients are selected by provider name and
//! model identifier from the session configuration.

pub mod elevenlabs;
pub mod groq;
pub mod vad;
pub mod wav;

use crate::error::AgentError;
use async_trait::async_trait;
use concierge_types::{
    LlmConfig, LlmProvider, SttConfig, SttProvider, ToolDefinition, TtsConfig, TtsProvider,
};
use std::fmt;
use std::sync::Arc;

/// API credentials for the external providers, loaded once at process start.
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub groq_api_key: String,
    pub elevenlabs_api_key: String,
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("groq_api_key", &"[REDACTED]")
            .field("elevenlabs_api_key", &"[REDACTED]")
            .finish()
    }
}

/// Speech-to-text capability.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribes one complete PCM16 mono utterance.
    async fn transcribe(&self, pcm: &[u8], sample_rate: u32) -> Result<String, AgentError>;
}

/// One tool call requested by the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    /// Raw JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

/// Outcome of one language-model completion.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmReply {
    /// Assistant text, ready for synthesis.
    Text(String),
    /// The model wants tool results before it will answer.
    ToolCalls(Vec<ToolInvocation>),
}

/// Language-model capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[serde_json::Value],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, AgentError>;
}

/// Text-to-speech capability.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesizes the text and returns raw PCM16 audio.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AgentError>;

    /// Sample rate of the audio `synthesize` returns.
    fn sample_rate(&self) -> u32;
}

/// Instantiates the configured speech-to-text client.
pub fn build_stt(
    config: &SttConfig,
    creds: &ProviderCredentials,
) -> Result<Arc<dyn SpeechToText>, AgentError> {
    match config.provider {
        SttProvider::Groq => {
            if creds.groq_api_key.is_empty() {
                return Err(AgentError::Config(
                    "GROQ_API_KEY is required for the Groq STT provider".to_string(),
                ));
            }
            Ok(Arc::new(groq::GroqStt::from_config(
                config,
                &creds.groq_api_key,
            )))
        }
    }
}

/// Instantiates the configured language-model client.
pub fn build_llm(
    config: &LlmConfig,
    creds: &ProviderCredentials,
) -> Result<Arc<dyn LanguageModel>, AgentError> {
    match config.provider {
        LlmProvider::Groq => {
            if creds.groq_api_key.is_empty() {
                return Err(AgentError::Config(
                    "GROQ_API_KEY is required for the Groq LLM provider".to_string(),
                ));
            }
            Ok(Arc::new(groq::GroqLlm::from_config(
                config,
                &creds.groq_api_key,
            )))
        }
    }
}

/// Instantiates the configured text-to-speech client.
pub fn build_tts(
    config: &TtsConfig,
    creds: &ProviderCredentials,
) -> Result<Arc<dyn TextToSpeech>, AgentError> {
    match config.provider {
        TtsProvider::ElevenLabs => {
            if creds.elevenlabs_api_key.is_empty() {
                return Err(AgentError::Config(
                    "ELEVENLABS_API_KEY is required for the ElevenLabs TTS provider".to_string(),
                ));
            }
            Ok(Arc::new(elevenlabs::ElevenLabsTts::from_config(
                config,
                &creds.elevenlabs_api_key,
            )))
        }
    }
}
