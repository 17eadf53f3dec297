//! Agent runtime for the Concierge voice worker.
//!
//! Provides the plumbing a voice-assistant job needs: room signaling and a
//! room handle with audio seams, provider clients for speech-to-text,
//! language-model reasoning, and text-to-speech, a local voice-activity
//! gate, a per-agent tool registry, session assembly with the conversation
//! loop, and the worker that turns dispatched jobs into running sessions.
//!
//! The heavy lifting (WebRTC media, speech models, language-model
//! inference) belongs to external services. This crate only wires them
//! together and owns the per-job lifecycle.

pub mod agent;
pub mod config;
pub mod error;
pub mod job;
pub mod providers;
pub mod room;
pub mod session;
pub mod tool;
pub mod worker;

pub use agent::Agent;
pub use config::LiveKitConfig;
pub use error::AgentError;
pub use job::{Job, JobContext, JobState};
pub use room::{AudioFrame, LiveKitConnector, RoomConnection, RoomConnector, RoomService};
pub use session::AgentSession;
pub use tool::{RunContext, Tool, ToolHandler, ToolSet};
pub use worker::{JobHandler, JobQueue, Worker, WorkerOptions};
