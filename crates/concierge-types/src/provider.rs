//! Provider selection and pipeline configuration.
//!
//! A session binds four pluggable capabilities, each selected by provider
//! name and model identifier. The structures here are plain data: the
//! concrete clients live in `concierge-agent` and are instantiated from
//! these values once per job.

use serde::{Deserialize, Serialize};

/// Supported voice-activity detection providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VadProvider {
    /// Silero-style windowed detection, evaluated locally.
    #[default]
    Silero,
}

/// Supported speech-to-text providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SttProvider {
    /// Groq-hosted Whisper transcription.
    #[default]
    Groq,
}

/// Supported language-model providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Groq chat completions.
    #[default]
    Groq,
}

/// Supported text-to-speech providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsProvider {
    /// ElevenLabs HTTP synthesis.
    #[default]
    ElevenLabs,
}

/// Tuning parameters for the voice-activity gate.
///
/// `start_secs` and `stop_secs` are hold times: speech (or silence) must be
/// sustained that long before a transition is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VadParams {
    /// Per-window confidence threshold in `[0.0, 1.0]`.
    #[serde(default = "default_vad_confidence")]
    pub confidence: f64,
    /// Sustained speech required before a speech-start is confirmed.
    #[serde(default = "default_vad_start_secs")]
    pub start_secs: f64,
    /// Sustained silence required before a speech-stop is confirmed.
    #[serde(default = "default_vad_stop_secs")]
    pub stop_secs: f64,
    /// Smoothed-volume floor; windows quieter than this never count as speech.
    #[serde(default = "default_vad_min_volume")]
    pub min_volume: f64,
}

fn default_vad_confidence() -> f64 {
    0.7
}

fn default_vad_start_secs() -> f64 {
    0.2
}

fn default_vad_stop_secs() -> f64 {
    0.8
}

fn default_vad_min_volume() -> f64 {
    0.6
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            confidence: default_vad_confidence(),
            start_secs: default_vad_start_secs(),
            stop_secs: default_vad_stop_secs(),
            min_volume: default_vad_min_volume(),
        }
    }
}

/// Voice-activity detection configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VadConfig {
    #[serde(default)]
    pub provider: VadProvider,
    #[serde(default)]
    pub params: VadParams,
}

/// Speech-to-text configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default)]
    pub provider: SttProvider,
    /// Transcription model identifier.
    #[serde(default = "default_stt_model")]
    pub model: String,
    /// Optional ISO-639-1 language hint passed to the provider.
    #[serde(default)]
    pub language: Option<String>,
}

fn default_stt_model() -> String {
    "whisper-large-v3-turbo".to_string()
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            provider: SttProvider::default(),
            model: default_stt_model(),
            language: None,
        }
    }
}

/// Language-model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Chat model identifier.
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Sampling temperature; provider default when unset.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Completion token cap; provider default when unset.
    #[serde(default)]
    pub max_tokens: Option<u64>,
}

fn default_llm_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_llm_model(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Text-to-speech configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub provider: TtsProvider,
    /// Voice identifier within the provider's catalogue.
    #[serde(default = "default_tts_voice_id")]
    pub voice_id: String,
    /// Synthesis model identifier.
    #[serde(default = "default_tts_model")]
    pub model: String,
    /// Audio output format (e.g. `pcm_24000`, `pcm_16000`).
    #[serde(default = "default_tts_output_format")]
    pub output_format: String,
}

fn default_tts_voice_id() -> String {
    // "Bella"
    "EXAVITQu4vr4xnSDxMaL".to_string()
}

fn default_tts_model() -> String {
    "eleven_turbo_v2_5".to_string()
}

fn default_tts_output_format() -> String {
    "pcm_24000".to_string()
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            voice_id: default_tts_voice_id(),
            model: default_tts_model(),
            output_format: default_tts_output_format(),
        }
    }
}

/// The full pipeline configuration for one session.
///
/// One instance per connected job; immutable after construction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub vad: VadConfig,
    #[serde(default)]
    pub stt: SttConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tts: TtsConfig,
}
