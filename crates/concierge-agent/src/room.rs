//! Room signaling and the in-process room handle.
//!
//! [`RoomService`] talks to the LiveKit control plane (token minting, room
//! creation). [`RoomConnection`] is the handle a session holds once a job is
//! connected: it carries the join token plus capture/playback audio channels
//! that a media transport bridges to the actual WebRTC tracks. Media itself
//! is outside this crate.

use crate::config::LiveKitConfig;
use crate::error::AgentError;
use async_trait::async_trait;
use livekit_api::access_token::{AccessToken, VideoGrants};
use livekit_api::services::room::{CreateRoomOptions, RoomClient};
use livekit_protocol::Room;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::info;

/// Capacity of the per-room capture and playback broadcast channels.
const AUDIO_BROADCAST_CAPACITY: usize = 256;

/// One block of PCM16 audio moving through a room.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw samples, 16-bit signed little-endian, mono.
    pub data: Vec<u8>,
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(data: Vec<u8>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }
}

struct RoomShared {
    room_name: String,
    url: String,
    join_token: String,
    /// Audio heard in the room (transport side sends, session subscribes).
    capture_tx: broadcast::Sender<AudioFrame>,
    /// Audio the agent speaks (session sends, transport subscribes).
    playback_tx: broadcast::Sender<AudioFrame>,
    closed_tx: watch::Sender<bool>,
}

/// Handle to one connected room.
///
/// Cheap to clone; all clones refer to the same underlying channels, so a
/// media transport and a session can hold the two ends independently.
#[derive(Clone)]
pub struct RoomConnection {
    shared: Arc<RoomShared>,
}

impl RoomConnection {
    pub fn new(
        room_name: impl Into<String>,
        url: impl Into<String>,
        join_token: impl Into<String>,
    ) -> Self {
        let (capture_tx, _) = broadcast::channel(AUDIO_BROADCAST_CAPACITY);
        let (playback_tx, _) = broadcast::channel(AUDIO_BROADCAST_CAPACITY);
        let (closed_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(RoomShared {
                room_name: room_name.into(),
                url: url.into(),
                join_token: join_token.into(),
                capture_tx,
                playback_tx,
                closed_tx,
            }),
        }
    }

    pub fn room_name(&self) -> &str {
        &self.shared.room_name
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Join token a media transport presents to the room service.
    pub fn join_token(&self) -> &str {
        &self.shared.join_token
    }

    pub fn is_connected(&self) -> bool {
        !*self.shared.closed_tx.borrow()
    }

    /// Subscribes to audio heard in the room.
    pub fn subscribe_audio(&self) -> broadcast::Receiver<AudioFrame> {
        self.shared.capture_tx.subscribe()
    }

    /// Subscribes to audio the agent publishes (the transport/playback side).
    pub fn subscribe_playback(&self) -> broadcast::Receiver<AudioFrame> {
        self.shared.playback_tx.subscribe()
    }

    /// Feeds audio heard in the room toward the session (transport side).
    pub fn feed_audio(&self, frame: AudioFrame) -> Result<(), AgentError> {
        if !self.is_connected() {
            return Err(AgentError::Room(format!(
                "room '{}' is closed",
                self.shared.room_name
            )));
        }
        // No receiver yet is fine; the frame is simply dropped.
        let _ = self.shared.capture_tx.send(frame);
        Ok(())
    }

    /// Publishes agent audio to the room (session side).
    pub fn publish_audio(&self, frame: AudioFrame) -> Result<(), AgentError> {
        if !self.is_connected() {
            return Err(AgentError::Room(format!(
                "room '{}' is closed",
                self.shared.room_name
            )));
        }
        let _ = self.shared.playback_tx.send(frame);
        Ok(())
    }

    /// Marks the room closed. Idempotent.
    pub fn close(&self) {
        if self.is_connected() {
            info!(room = %self.shared.room_name, "room closed");
            // send_replace: the flag must flip even with no watchers yet.
            self.shared.closed_tx.send_replace(true);
        }
    }

    /// Watch handle that flips to `true` when the room closes.
    pub fn closed_watch(&self) -> watch::Receiver<bool> {
        self.shared.closed_tx.subscribe()
    }

    /// Resolves once the room has been closed.
    pub async fn wait_closed(&self) {
        let mut closed = self.closed_watch();
        while !*closed.borrow_and_update() {
            if closed.changed().await.is_err() {
                return;
            }
        }
    }
}

impl std::fmt::Debug for RoomConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomConnection")
            .field("room_name", &self.shared.room_name)
            .field("url", &self.shared.url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Client for the room service control plane.
#[derive(Debug)]
pub struct RoomService {
    config: LiveKitConfig,
    room_client: RoomClient,
}

impl RoomService {
    pub fn new(config: LiveKitConfig) -> Self {
        let room_client =
            RoomClient::with_api_key(&config.url, &config.api_key, &config.api_secret);
        Self {
            config,
            room_client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.url.is_empty()
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Mints a join token granting publish/subscribe access to one room.
    pub fn mint_join_token(
        &self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
    ) -> Result<String, AgentError> {
        let token = AccessToken::with_api_key(&self.config.api_key, &self.config.api_secret)
            .with_identity(participant_identity)
            .with_name(participant_name)
            .with_grants(VideoGrants {
                room_join: true,
                room: room_name.to_string(),
                can_publish: true,
                can_subscribe: true,
                can_publish_data: true,
                ..Default::default()
            })
            .with_ttl(Duration::from_secs(self.config.token_ttl_seconds));

        token.to_jwt().map_err(AgentError::LiveKit)
    }

    /// Creates the room if it does not exist yet.
    pub async fn ensure_room(&self, name: &str) -> Result<Room, AgentError> {
        self.room_client
            .create_room(name, CreateRoomOptions::default())
            .await
            .map_err(|e| AgentError::Room(e.to_string()))
    }
}

/// Seam through which a job establishes its room link.
///
/// The production implementation goes through the LiveKit control plane;
/// tests substitute stubs that succeed or fail on demand.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn connect(&self, room_name: &str, identity: &str)
        -> Result<RoomConnection, AgentError>;
}

/// [`RoomConnector`] backed by the LiveKit room service.
#[derive(Debug)]
pub struct LiveKitConnector {
    service: RoomService,
}

impl LiveKitConnector {
    pub fn new(config: LiveKitConfig) -> Self {
        Self {
            service: RoomService::new(config),
        }
    }
}

#[async_trait]
impl RoomConnector for LiveKitConnector {
    async fn connect(
        &self,
        room_name: &str,
        identity: &str,
    ) -> Result<RoomConnection, AgentError> {
        if !self.service.is_enabled() {
            return Err(AgentError::Config(
                "LiveKit URL is not configured".to_string(),
            ));
        }

        let token = self.service.mint_join_token(room_name, identity, identity)?;
        let room = self.service.ensure_room(room_name).await?;
        info!(
            room = %room_name,
            sid = %room.sid,
            "connected to room"
        );

        Ok(RoomConnection::new(room_name, self.service.url(), token))
    }
}
