//! Session assembly and the conversation loop.
//!
//! An [`AgentSession`] binds an [`Agent`] to the four pipeline capabilities
//! and a connected room. Once started it owns the conversation: room audio
//! is segmented by the voice-activity gate, utterances are transcribed, the
//! language model answers (resolving tool calls through the agent's tool
//! set), and replies are synthesized and published back to the room.

use crate::agent::Agent;
use crate::error::AgentError;
use crate::providers::vad::{SpeechGate, VadEvent};
use crate::providers::{
    self, LanguageModel, LlmReply, ProviderCredentials, SpeechToText, TextToSpeech,
    ToolInvocation,
};
use crate::room::{AudioFrame, RoomConnection};
use crate::tool::RunContext;
use concierge_types::{SessionConfig, VadParams};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Cap on LLM round-trips spent resolving tool calls within one turn.
const MAX_TOOL_ROUNDS: usize = 4;

/// One agent session bound to one job.
pub struct AgentSession {
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,
    vad_params: VadParams,
    started: Mutex<Option<Started>>,
}

struct Started {
    engine: TurnEngine,
    loop_task: JoinHandle<()>,
}

impl AgentSession {
    /// Instantiates the configured providers and assembles a session.
    pub fn new(
        config: &SessionConfig,
        creds: &ProviderCredentials,
    ) -> Result<Self, AgentError> {
        match config.vad.provider {
            concierge_types::VadProvider::Silero => {}
        }
        Ok(Self {
            stt: providers::build_stt(&config.stt, creds)?,
            llm: providers::build_llm(&config.llm, creds)?,
            tts: providers::build_tts(&config.tts, creds)?,
            vad_params: config.vad.params.clone(),
            started: Mutex::new(None),
        })
    }

    /// Assembles a session from already-built capabilities.
    pub fn with_providers(
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn TextToSpeech>,
        vad_params: VadParams,
    ) -> Self {
        Self {
            stt,
            llm,
            tts,
            vad_params,
            started: Mutex::new(None),
        }
    }

    /// Binds the agent to the room and spawns the conversation loop.
    ///
    /// The loop runs until the room closes or the session is closed; further
    /// turns are driven entirely by room audio.
    pub async fn start(&self, agent: Agent, room: &RoomConnection) -> Result<(), AgentError> {
        let mut slot = self.started.lock().await;
        if slot.is_some() {
            return Err(AgentError::Config("session already started".to_string()));
        }
        if !room.is_connected() {
            return Err(AgentError::Room(format!(
                "room '{}' is closed",
                room.room_name()
            )));
        }

        let engine = TurnEngine {
            stt: Arc::clone(&self.stt),
            llm: Arc::clone(&self.llm),
            tts: Arc::clone(&self.tts),
            agent: Arc::new(agent),
            room: room.clone(),
            chat: Arc::new(Mutex::new(Vec::new())),
            run_ctx: RunContext::new(room.room_name()),
        };
        {
            let mut chat = engine.chat.lock().await;
            chat.push(json!({
                "role": "system",
                "content": engine.agent.instructions(),
            }));
        }

        let loop_task = tokio::spawn(conversation_loop(
            engine.clone(),
            self.vad_params.clone(),
        ));
        info!(room = %room.room_name(), "session started");

        *slot = Some(Started { engine, loop_task });
        Ok(())
    }

    /// Issues one scripted instruction, speaks the reply into the room, and
    /// returns the spoken text.
    pub async fn generate_reply(&self, instructions: &str) -> Result<String, AgentError> {
        let engine = {
            let slot = self.started.lock().await;
            let started = slot
                .as_ref()
                .ok_or_else(|| AgentError::Config("session not started".to_string()))?;
            started.engine.clone()
        };
        engine.scripted_reply(instructions).await
    }

    /// Stops the conversation loop. Idempotent; the room is left to its
    /// owner.
    pub async fn close(&self) {
        if let Some(started) = self.started.lock().await.take() {
            started.loop_task.abort();
            debug!(room = %started.engine.room.room_name(), "session closed");
        }
    }
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("vad_params", &self.vad_params)
            .finish()
    }
}

/// Everything one turn needs, cheap to clone into the loop task.
#[derive(Clone)]
struct TurnEngine {
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,
    agent: Arc<Agent>,
    room: RoomConnection,
    chat: Arc<Mutex<Vec<Value>>>,
    run_ctx: RunContext,
}

impl TurnEngine {
    /// Runs one scripted (instruction-driven) turn and speaks the reply.
    async fn scripted_reply(&self, instructions: &str) -> Result<String, AgentError> {
        self.chat.lock().await.push(json!({
            "role": "system",
            "content": instructions,
        }));
        let text = self.resolve().await?;
        self.speak(&text).await?;
        Ok(text)
    }

    /// Runs one user turn: transcribe, answer, speak.
    async fn user_turn(&self, pcm: Vec<u8>, sample_rate: u32) -> Result<(), AgentError> {
        let transcript = self.stt.transcribe(&pcm, sample_rate).await?;
        if transcript.is_empty() {
            debug!(room = %self.room.room_name(), "discarding empty transcription");
            return Ok(());
        }
        debug!(room = %self.room.room_name(), transcript = %transcript, "user turn");

        self.chat.lock().await.push(json!({
            "role": "user",
            "content": transcript,
        }));
        let reply = self.resolve().await?;
        self.speak(&reply).await
    }

    /// Queries the model until it produces text, resolving tool calls along
    /// the way. Appends all intermediate messages to the history.
    async fn resolve(&self) -> Result<String, AgentError> {
        let tools = self.agent.tools().definitions();

        for _ in 0..MAX_TOOL_ROUNDS {
            let messages = self.chat.lock().await.clone();
            match self.llm.complete(&messages, &tools).await? {
                LlmReply::Text(text) => {
                    self.chat.lock().await.push(json!({
                        "role": "assistant",
                        "content": text.clone(),
                    }));
                    return Ok(text);
                }
                LlmReply::ToolCalls(calls) => {
                    self.chat
                        .lock()
                        .await
                        .push(assistant_tool_call_message(&calls));
                    for call in calls {
                        let result = self.run_tool(&call).await;
                        self.chat.lock().await.push(json!({
                            "role": "tool",
                            "tool_call_id": call.id,
                            "content": result.to_string(),
                        }));
                    }
                }
            }
        }

        Err(AgentError::Llm(
            "tool-call budget exhausted without a reply".to_string(),
        ))
    }

    /// Executes one tool call. Failures (including names the model made up)
    /// become the tool result, leaving any user-facing recovery to the model.
    async fn run_tool(&self, call: &ToolInvocation) -> Value {
        let args: Value = serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
        match self
            .agent
            .tools()
            .invoke(&call.name, &self.run_ctx, args)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(tool_name = %call.name, error = %e, "tool call failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn speak(&self, text: &str) -> Result<(), AgentError> {
        let audio = self.tts.synthesize(text).await?;
        self.room
            .publish_audio(AudioFrame::new(audio, self.tts.sample_rate()))
    }
}

/// Formats the assistant message acknowledging requested tool calls.
fn assistant_tool_call_message(calls: &[ToolInvocation]) -> Value {
    let rendered: Vec<Value> = calls
        .iter()
        .map(|call| {
            json!({
                "id": call.id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": call.arguments,
                }
            })
        })
        .collect();
    json!({ "role": "assistant", "tool_calls": rendered })
}

/// Drives the session from room audio until the room closes.
async fn conversation_loop(engine: TurnEngine, vad_params: VadParams) {
    let mut audio_rx = engine.room.subscribe_audio();
    let mut closed = engine.room.closed_watch();
    let mut gate: Option<SpeechGate> = None;
    let mut utterance: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            changed = closed.changed() => {
                if changed.is_err() || *closed.borrow() {
                    break;
                }
            }
            frame = audio_rx.recv() => {
                match frame {
                    Ok(frame) => {
                        let stale = gate
                            .as_ref()
                            .map(|g| g.sample_rate() != frame.sample_rate)
                            .unwrap_or(true);
                        if stale {
                            gate = Some(SpeechGate::new(vad_params.clone(), frame.sample_rate));
                            utterance.clear();
                        }
                        let Some(gate) = gate.as_mut() else { continue };

                        let event = gate.push(&frame.data);
                        if gate.in_utterance() {
                            utterance.extend_from_slice(&frame.data);
                        }
                        if event == Some(VadEvent::SpeechStopped) && !utterance.is_empty() {
                            let pcm = std::mem::take(&mut utterance);
                            if let Err(e) = engine.user_turn(pcm, frame.sample_rate).await {
                                error!(
                                    room = %engine.room.room_name(),
                                    error = %e,
                                    "conversation turn failed"
                                );
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "audio receiver lagging, utterance discarded");
                        if let Some(gate) = gate.as_mut() {
                            gate.reset();
                        }
                        utterance.clear();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
    debug!(room = %engine.room.room_name(), "conversation loop ended");
}
