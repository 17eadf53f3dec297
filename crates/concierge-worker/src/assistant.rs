//! The voice assistant itself: instructions, the weather tool, and the job
//! entrypoint.

use async_trait::async_trait;
use concierge_agent::providers::ProviderCredentials;
use concierge_agent::{
    Agent, AgentError, AgentSession, JobContext, JobHandler, RunContext, Tool, ToolHandler,
};
use concierge_types::{SessionConfig, ToolDefinition};
use serde_json::{json, Value};
use std::sync::Arc;

/// Behavioral prompt for the assistant.
pub const INSTRUCTIONS: &str = "\
You are a friendly voice assistant built by Concierge.
Start every conversation by greeting the user.
Only use the `lookup_weather` tool if the user specifically asks for weather information.
Never assume a location or provide weather data without a request.";

/// Scripted conversation opener, issued once per job.
pub const GREETING_INSTRUCTIONS: &str =
    "Say hello, then ask the user how their day is going and how you can help.";

/// Mock weather lookup: a fixed payload for any location, no external call.
struct LookupWeather;

#[async_trait]
impl ToolHandler for LookupWeather {
    async fn call(&self, _ctx: &RunContext, _args: Value) -> Result<Value, AgentError> {
        Ok(json!({ "weather": "sunny", "temperature": 70 }))
    }
}

/// The `lookup_weather` tool registered with every agent.
pub fn lookup_weather_tool() -> Tool {
    Tool::new(
        ToolDefinition::new(
            "lookup_weather",
            "Used to look up weather information.",
            json!({
                "type": "object",
                "properties": {
                    "location": {
                        "type": "string",
                        "description": "City or place to look up.",
                    }
                },
                "required": ["location"],
            }),
        ),
        Arc::new(LookupWeather),
    )
}

/// Fresh agent definition for one job.
pub fn build_agent() -> Agent {
    Agent::builder()
        .instructions(INSTRUCTIONS)
        .tool(lookup_weather_tool())
        .build()
}

/// Job entrypoint registered with the worker.
///
/// Holds only immutable templates; every job gets a fresh agent and session
/// built from them.
pub struct Assistant {
    session_config: SessionConfig,
    credentials: ProviderCredentials,
}

impl Assistant {
    pub fn new(session_config: SessionConfig, credentials: ProviderCredentials) -> Self {
        Self {
            session_config,
            credentials,
        }
    }
}

#[async_trait]
impl JobHandler for Assistant {
    async fn run(&self, ctx: JobContext) -> Result<(), AgentError> {
        let session = AgentSession::new(&self.session_config, &self.credentials)?;
        run_job(ctx, session).await
    }
}

/// Connects, starts the session, speaks the opener, and yields to the
/// runtime until the room goes away.
async fn run_job(mut ctx: JobContext, session: AgentSession) -> Result<(), AgentError> {
    let room = ctx.connect().await?;

    session.start(build_agent(), &room).await?;
    session.generate_reply(GREETING_INSTRUCTIONS).await?;

    room.wait_closed().await;
    session.close().await;
    ctx.close();
    Ok(())
}
