//! Preview session WebSocket.
//!
//! A session is bound to one job by an `init` message. Each `update` renders a
//! single composited still and answers with a `preview_frame`. Messages of a
//! session are handled strictly in arrival order; failures are reported as
//! `error` messages and never close the session.

use std::sync::atomic::{AtomicI64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use greenroom_models::{CompositionSettings, JobId, PreviewRequest, PreviewResponse};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::services::JobService;
use crate::state::AppState;

const ENDPOINT: &str = "preview";
const WS_SEND_BUFFER_SIZE: usize = 32;

pub const PREVIEW_FAILED: &str = "Failed to generate preview.";
pub const NOT_INITIALIZED: &str = "Preview session is not initialized. Send init first.";
pub const INVALID_MESSAGE: &str = "Invalid preview message.";

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Per-connection session state.
pub struct PreviewSession {
    jobs: JobService,
    job_id: Option<JobId>,
}

impl PreviewSession {
    pub fn new(jobs: JobService) -> Self {
        Self { jobs, job_id: None }
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job_id.as_ref()
    }

    /// Handle one text frame. `None` means nothing is sent back.
    pub async fn handle_text(&mut self, text: &str) -> Option<PreviewResponse> {
        let request: PreviewRequest = match serde_json::from_str(text) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "Malformed preview message");
                return Some(PreviewResponse::error(INVALID_MESSAGE));
            }
        };

        match request {
            PreviewRequest::Init { job_id } => self.init(job_id).await,
            PreviewRequest::Update { settings } => Some(self.update(settings).await),
        }
    }

    /// Bind the session. The job is looked up again on every update, so an
    /// unknown id only surfaces once a frame is asked for.
    async fn init(&mut self, job_id: JobId) -> Option<PreviewResponse> {
        match self.jobs.get_status(&job_id).await {
            Ok(_) => info!(job_id = %job_id, "Preview session initialized"),
            Err(e) => warn!(job_id = %job_id, error = %e, "Preview session bound to unknown job"),
        }
        self.job_id = Some(job_id);
        None
    }

    async fn update(&self, settings: CompositionSettings) -> PreviewResponse {
        let Some(job_id) = &self.job_id else {
            return PreviewResponse::error(NOT_INITIALIZED);
        };

        match self.jobs.render_preview_frame(job_id, settings).await {
            Ok(image) => PreviewResponse::frame(image),
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Preview frame failed");
                PreviewResponse::error(PREVIEW_FAILED)
            }
        }
    }
}

/// `GET /api/preview`: upgrade to a preview session.
pub async fn ws_preview(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection(ENDPOINT);

    ws.on_upgrade(|socket| async move {
        handle_preview_socket(socket, state).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

async fn handle_preview_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut session = PreviewSession::new(state.jobs.clone());
    debug!("Preview session opened");

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "Preview socket error");
                break;
            }
        };
        metrics::record_ws_message_received(ENDPOINT);

        let Some(response) = session.handle_text(&text).await else {
            continue;
        };
        let json = match serde_json::to_string(&response) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize preview response");
                continue;
            }
        };
        metrics::record_ws_message_sent(ENDPOINT, response.message_type().as_str());
        if tx.send(Message::Text(json)).await.is_err() {
            break;
        }
    }

    drop(tx);
    let _ = send_task.await;
    debug!(job_id = ?session.job_id(), "Preview session closed");
}
