//! Groq provider clients: Whisper batch transcription and chat completions.

use crate::error::AgentError;
use crate::providers::wav::{wrap_pcm_in_wav, FormBody};
use crate::providers::{LanguageModel, LlmReply, SpeechToText, ToolInvocation};
use async_trait::async_trait;
use concierge_types::{LlmConfig, SttConfig, ToolDefinition};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
}

// ---------------------------------------------------------------------------
// Speech-to-text
// ---------------------------------------------------------------------------

/// Batch speech-to-text against Groq's hosted Whisper models.
///
/// Each utterance is wrapped in a WAV container and uploaded to
/// `/audio/transcriptions` as multipart form data.
#[derive(Debug, Clone)]
pub struct GroqStt {
    api_key: String,
    model: String,
    language: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl GroqStt {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            language: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http_client(),
        }
    }

    pub fn from_config(config: &SttConfig, api_key: &str) -> Self {
        let mut stt = Self::new(api_key, &config.model);
        stt.language = config.language.clone();
        stt
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl SpeechToText for GroqStt {
    async fn transcribe(&self, pcm: &[u8], sample_rate: u32) -> Result<String, AgentError> {
        let wav = wrap_pcm_in_wav(pcm, sample_rate, 1);

        let mut form = FormBody::new();
        form.push_text("model", &self.model);
        form.push_text("response_format", "json");
        if let Some(language) = &self.language {
            form.push_text("language", language);
        }
        form.push_file("file", "utterance.wav", "audio/wav", &wav);
        let (content_type, body) = form.finish();

        let url = format!("{}/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| AgentError::Stt(format!("request to Groq failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Stt(format!("failed to read Groq response: {e}")))?;
        if !status.is_success() {
            return Err(AgentError::Stt(format!(
                "Groq API returned status {status}: {text}"
            )));
        }

        let parsed: TranscriptionResponse = serde_json::from_str(&text)
            .map_err(|e| AgentError::Stt(format!("unexpected transcription response: {e}")))?;
        Ok(parsed.text.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Language model
// ---------------------------------------------------------------------------

/// Non-streaming chat completions against the Groq API, with tool support.
#[derive(Debug, Clone)]
pub struct GroqLlm {
    api_key: String,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u64>,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    #[serde(default)]
    id: String,
    #[serde(default)]
    function: Option<ChatFunction>,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    arguments: String,
}

impl GroqLlm {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http_client(),
        }
    }

    pub fn from_config(config: &LlmConfig, api_key: &str) -> Self {
        let mut llm = Self::new(api_key, &config.model);
        llm.temperature = config.temperature;
        llm.max_tokens = config.max_tokens;
        llm
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, messages: &[Value], tools: &[ToolDefinition]) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(|t| t.function_spec()).collect());
        }
        if let Some(temperature) = self.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl LanguageModel for GroqLlm {
    async fn complete(
        &self,
        messages: &[Value],
        tools: &[ToolDefinition],
    ) -> Result<LlmReply, AgentError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(messages, tools))
            .send()
            .await
            .map_err(|e| AgentError::Llm(format!("request to Groq failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Llm(format!("failed to read Groq response: {e}")))?;
        if !status.is_success() {
            return Err(AgentError::Llm(format!(
                "Groq API returned status {status}: {text}"
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| AgentError::Llm(format!("unexpected completion response: {e}")))?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .ok_or_else(|| AgentError::Llm("completion contained no choices".to_string()))?;

        if let Some(calls) = message.tool_calls.filter(|c| !c.is_empty()) {
            let invocations = calls
                .into_iter()
                .filter_map(|call| {
                    call.function.map(|f| ToolInvocation {
                        id: call.id,
                        name: f.name,
                        arguments: f.arguments,
                    })
                })
                .collect();
            return Ok(LlmReply::ToolCalls(invocations));
        }

        match message.content {
            Some(content) if !content.is_empty() => Ok(LlmReply::Text(content)),
            _ => Err(AgentError::Llm("completion contained no content".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_includes_model_messages_and_tools() {
        let llm = GroqLlm::new("gsk_test", "llama-3.3-70b-versatile")
            .with_temperature(0.7)
            .with_max_tokens(256);
        let messages = vec![json!({"role": "system", "content": "be brief"})];
        let tools = vec![ToolDefinition::new(
            "lookup_weather",
            "Look up weather information.",
            json!({"type": "object"}),
        )];

        let body = llm.request_body(&messages, &tools);
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["tools"][0]["function"]["name"], "lookup_weather");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn request_body_omits_empty_tools() {
        let llm = GroqLlm::new("gsk_test", "llama-3.3-70b-versatile");
        let body = llm.request_body(&[], &[]);
        assert!(body.get("tools").is_none());
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn parses_text_completion() {
        let raw = r#"{"choices":[{"message":{"content":"Hello there"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let message = parsed.choices[0].message.as_ref().unwrap();
        assert_eq!(message.content.as_deref(), Some("Hello there"));
        assert!(message.tool_calls.is_none());
    }

    #[test]
    fn parses_tool_call_completion() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "lookup_weather", "arguments": "{\"location\":\"Oslo\"}"}
                    }]
                }
            }]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let message = parsed.choices[0].message.as_ref().unwrap();
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.as_ref().unwrap().name, "lookup_weather");
    }

    #[test]
    fn from_config_picks_up_model_and_sampling() {
        let config = LlmConfig {
            model: "llama-3.1-8b-instant".to_string(),
            temperature: Some(0.2),
            ..Default::default()
        };
        let llm = GroqLlm::from_config(&config, "gsk_test");
        assert_eq!(llm.model(), "llama-3.1-8b-instant");
        assert_eq!(llm.temperature, Some(0.2));
    }

    #[test]
    fn stt_from_config_keeps_language_hint() {
        let config = SttConfig {
            language: Some("en".to_string()),
            ..Default::default()
        };
        let stt = GroqStt::from_config(&config, "gsk_test");
        assert_eq!(stt.model(), "whisper-large-v3-turbo");
        assert_eq!(stt.language.as_deref(), Some("en"));
    }
}
