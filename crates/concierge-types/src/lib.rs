//! Shared types and constants for the Concierge voice worker.
//!
//! This crate provides the configuration structures that describe a voice
//! pipeline (which provider supplies voice-activity detection,
//! speech-to-text, language-model reasoning, and text-to-speech) plus the
//! tool definitions exposed to the language model.
//!
//! No crate in the workspace depends on anything *except* `concierge-types`
//! for cross-cutting type definitions. This keeps the dependency graph clean
//! and prevents circular dependencies.

pub mod provider;
pub mod tool;

pub use provider::{
    LlmConfig, LlmProvider, SessionConfig, SttConfig, SttProvider, TtsConfig, TtsProvider,
    VadConfig, VadParams, VadProvider,
};
pub use tool::ToolDefinition;

/// Default listening port for the worker control / liveness surface.
///
/// Overridden by the `PORT` environment variable.
pub const DEFAULT_PORT: u16 = 8080;
