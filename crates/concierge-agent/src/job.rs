//! Per-job lifecycle: `Connecting → Active → Closed`.
//!
//! A job is one assignment of this worker to a room. The context is handed
//! to the entrypoint, which connects, assembles its agent and session, and
//! yields control back to the runtime. Nothing survives a job: every
//! instantiation gets a fresh context.

use crate::error::AgentError;
use crate::room::{RoomConnection, RoomConnector};
use crate::tool::RunContext;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

/// One assignment of this worker to a room.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub room_name: String,
}

impl Job {
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_name: room_name.into(),
        }
    }
}

/// Lifecycle states of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Establishing the transport link to the assigned room.
    Connecting,
    /// Connected; the session drives the conversation.
    Active,
    /// Terminal: disconnect, cancellation, or unrecoverable error.
    Closed,
}

/// Context handed to the entrypoint for one job.
pub struct JobContext {
    job: Job,
    connector: Arc<dyn RoomConnector>,
    state_tx: watch::Sender<JobState>,
    connection: Option<RoomConnection>,
}

impl JobContext {
    pub fn new(job: Job, connector: Arc<dyn RoomConnector>) -> Self {
        let (state_tx, _) = watch::channel(JobState::Connecting);
        Self {
            job,
            connector,
            state_tx,
            connection: None,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn state(&self) -> JobState {
        *self.state_tx.borrow()
    }

    /// Watch handle for observing state transitions.
    pub fn state_watch(&self) -> watch::Receiver<JobState> {
        self.state_tx.subscribe()
    }

    /// Execution context for tool handlers running under this job.
    pub fn run_context(&self) -> RunContext {
        RunContext::new(&self.job.room_name)
    }

    /// The room link, once `connect` has succeeded.
    pub fn room(&self) -> Option<&RoomConnection> {
        self.connection.as_ref()
    }

    /// Establishes the transport link to the assigned room.
    ///
    /// On failure the job is marked `Closed` and the error propagates to the
    /// worker, which owns failure reporting; there is no local retry.
    pub async fn connect(&mut self) -> Result<RoomConnection, AgentError> {
        let identity = format!("agent-{}", self.job.id);
        match self
            .connector
            .connect(&self.job.room_name, &identity)
            .await
        {
            Ok(connection) => {
                self.connection = Some(connection.clone());
                self.state_tx.send_replace(JobState::Active);
                info!(job_id = %self.job.id, room = %self.job.room_name, "job active");
                Ok(connection)
            }
            Err(e) => {
                self.state_tx.send_replace(JobState::Closed);
                warn!(
                    job_id = %self.job.id,
                    room = %self.job.room_name,
                    error = %e,
                    "room connection failed"
                );
                Err(e)
            }
        }
    }

    /// Closes the job and its room link. Idempotent.
    pub fn close(&mut self) {
        if let Some(connection) = &self.connection {
            connection.close();
        }
        if self.state() != JobState::Closed {
            self.state_tx.send_replace(JobState::Closed);
            info!(job_id = %self.job.id, room = %self.job.room_name, "job closed");
        }
    }
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("job", &self.job)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct AlwaysConnect;

    #[async_trait]
    impl RoomConnector for AlwaysConnect {
        async fn connect(
            &self,
            room_name: &str,
            _identity: &str,
        ) -> Result<RoomConnection, AgentError> {
            Ok(RoomConnection::new(room_name, "wss://test", "token"))
        }
    }

    struct NeverConnect;

    #[async_trait]
    impl RoomConnector for NeverConnect {
        async fn connect(
            &self,
            _room_name: &str,
            _identity: &str,
        ) -> Result<RoomConnection, AgentError> {
            Err(AgentError::Room("room unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn reachable_room_reaches_active() {
        let mut ctx = JobContext::new(Job::new("lobby"), Arc::new(AlwaysConnect));
        assert_eq!(ctx.state(), JobState::Connecting);

        let room = ctx.connect().await.unwrap();
        assert_eq!(ctx.state(), JobState::Active);
        assert_eq!(room.room_name(), "lobby");
        assert_eq!(ctx.run_context().room_name, "lobby");
        assert!(ctx.room().is_some());
    }

    #[tokio::test]
    async fn unreachable_room_closes_without_activating() {
        let mut ctx = JobContext::new(Job::new("lobby"), Arc::new(NeverConnect));
        let err = ctx.connect().await.unwrap_err();

        assert!(matches!(err, AgentError::Room(_)));
        assert_eq!(ctx.state(), JobState::Closed);
        assert!(ctx.room().is_none());
    }

    #[tokio::test]
    async fn close_closes_the_room_link() {
        let mut ctx = JobContext::new(Job::new("lobby"), Arc::new(AlwaysConnect));
        let room = ctx.connect().await.unwrap();
        assert!(room.is_connected());

        ctx.close();
        assert_eq!(ctx.state(), JobState::Closed);
        assert!(!room.is_connected());
    }

    #[tokio::test]
    async fn jobs_get_distinct_ids() {
        let a = Job::new("lobby");
        let b = Job::new("lobby");
        assert_ne!(a.id, b.id);
    }
}
