//! Worker control / liveness HTTP surface.
//!
//! A single listener serves both concerns: `POST /jobs` dispatches a job to
//! the worker over the queue, and (when enabled) every `GET` to any other
//! path answers with a fixed HTML page for hosting-platform liveness
//! probes. The liveness handler logs nothing per request and shares no
//! state with the pipeline.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use concierge_agent::JobQueue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed body returned to liveness probes.
pub const LIVENESS_BODY: &str = "<h1>Concierge agent is running!</h1>\
<p>This is a voice assistant worker waiting for room connections.</p>";

/// State shared with the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: JobQueue,
    pub health_enabled: bool,
}

/// Builds the control-surface router.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new().route("/jobs", post(dispatch_job));
    if state.health_enabled {
        // Any GET, any path, answers the probe.
        router = router
            .route("/", get(liveness))
            .route("/{*path}", get(liveness));
    }
    router.with_state(state)
}

async fn liveness() -> Html<&'static str> {
    Html(LIVENESS_BODY)
}

/// Dispatch request: which room this worker should join.
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub room_name: String,
}

/// Dispatch acknowledgment.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub job_id: Uuid,
}

async fn dispatch_job(
    State(state): State<AppState>,
    Json(request): Json<DispatchRequest>,
) -> Result<(StatusCode, Json<DispatchResponse>), StatusCode> {
    match state.queue.dispatch(&request.room_name).await {
        Ok(job_id) => Ok((StatusCode::ACCEPTED, Json(DispatchResponse { job_id }))),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}
