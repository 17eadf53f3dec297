//! The worker: turns dispatched jobs into running entrypoint invocations.
//!
//! Jobs arrive over an mpsc channel (the HTTP control surface holds the
//! sending half), so the worker shares no mutable state with anything else
//! in the process. Each job runs in its own task; the worker drains
//! in-flight jobs before shutting down.

use crate::error::AgentError;
use crate::job::{Job, JobContext};
use crate::room::RoomConnector;
use async_trait::async_trait;
use concierge_types::DEFAULT_PORT;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};
use uuid::Uuid;

/// Backlog of dispatched-but-unstarted jobs.
const DISPATCH_QUEUE_CAPACITY: usize = 64;

/// Entrypoint invoked once per assigned job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, ctx: JobContext) -> Result<(), AgentError>;
}

/// Process-wide worker options, set once at startup.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Address the control / liveness listener binds to.
    pub host: IpAddr,
    /// Listening port; `PORT` from the environment in production.
    pub port: u16,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl WorkerOptions {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Sending half of the dispatch channel; held by the control surface.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
}

impl JobQueue {
    /// Enqueues a job for the worker and returns its id.
    pub async fn dispatch(&self, room_name: impl Into<String>) -> Result<Uuid, AgentError> {
        let job = Job::new(room_name);
        let id = job.id;
        self.tx
            .send(job)
            .await
            .map_err(|_| AgentError::Room("worker is shut down".to_string()))?;
        Ok(id)
    }
}

/// Receives dispatched jobs and runs the entrypoint for each.
pub struct Worker {
    rx: mpsc::Receiver<Job>,
    handler: Arc<dyn JobHandler>,
    connector: Arc<dyn RoomConnector>,
}

impl Worker {
    pub fn new(
        handler: Arc<dyn JobHandler>,
        connector: Arc<dyn RoomConnector>,
    ) -> (Self, JobQueue) {
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE_CAPACITY);
        (
            Self {
                rx,
                handler,
                connector,
            },
            JobQueue { tx },
        )
    }

    /// Runs until the shutdown future resolves or every [`JobQueue`] handle
    /// is dropped, then waits for in-flight jobs to finish.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut jobs = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("worker shutting down");
                    break;
                }
                job = self.rx.recv() => {
                    match job {
                        Some(job) => {
                            info!(job_id = %job.id, room = %job.room_name, "job assigned");
                            let handler = Arc::clone(&self.handler);
                            let connector = Arc::clone(&self.connector);
                            jobs.spawn(async move {
                                let id = job.id;
                                let room = job.room_name.clone();
                                let ctx = JobContext::new(job, connector);
                                match handler.run(ctx).await {
                                    Ok(()) => {
                                        info!(job_id = %id, room = %room, "job finished");
                                    }
                                    Err(e) => {
                                        error!(
                                            job_id = %id,
                                            room = %room,
                                            error = %e,
                                            "job failed"
                                        );
                                    }
                                }
                            });
                        }
                        None => break,
                    }
                }
                Some(_) = jobs.join_next(), if !jobs.is_empty() => {}
            }
        }

        while jobs.join_next().await.is_some() {}
    }
}
