use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LiveKit API error: {0}")]
    LiveKit(#[from] livekit_api::access_token::AccessTokenError),

    #[error("room service error: {0}")]
    Room(String),

    #[error("speech-to-text error: {0}")]
    Stt(String),

    #[error("language model error: {0}")]
    Llm(String),

    #[error("text-to-speech error: {0}")]
    Tts(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
