use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::auth::{require_token, TokenGuard};
use crate::bot::dispatcher::Dispatcher;
use crate::bot::reply::{CollectingSink, Reply};
use crate::reports::ReportPeriod;

/// Route prefix under which rendered reports can be downloaded
pub const REPORTS_ROUTE: &str = "/reports";

#[derive(Clone)]
struct WebhookState {
    dispatcher: Dispatcher,
    reports_dir: PathBuf,
}

/// Message handed over by the messaging gateway
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub from: Option<String>,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub replies: Vec<WebhookReply>,
}

/// A reply plus, for documents, where the gateway can fetch the file
#[derive(Debug, Serialize)]
pub struct WebhookReply {
    #[serde(flatten)]
    pub reply: Reply,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<Reply> for WebhookReply {
    fn from(reply: Reply) -> Self {
        let url = match &reply {
            Reply::Document { path, .. } => path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| format!("{}/{}", REPORTS_ROUTE, name)),
            Reply::Text { .. } => None,
        };
        WebhookReply { reply, url }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

pub fn create_webhook_router(
    dispatcher: Dispatcher,
    reports_dir: PathBuf,
    guard: TokenGuard,
) -> Router {
    let state = WebhookState {
        dispatcher,
        reports_dir,
    };
    let hook_routes = Router::new()
        .route("/webhook/message", post(receive_message))
        .route("/reports/{file_name}", get(download_report))
        .layer(middleware::from_fn_with_state(guard, require_token))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .merge(hook_routes)
}

async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
        }),
    )
}

/// 200 with the replies, or 204 when the message was ignored
#[instrument(skip(state, message))]
async fn receive_message(
    State(state): State<WebhookState>,
    Json(message): Json<InboundMessage>,
) -> Response {
    debug!(
        "Message received from {}",
        message.from.as_deref().unwrap_or("unknown")
    );
    let mut sink = CollectingSink::default();
    state.dispatcher.handle(&message.body, &mut sink).await;

    if sink.replies.is_empty() {
        debug!("No reply for message");
        return StatusCode::NO_CONTENT.into_response();
    }

    info!("Returning {} replies", sink.replies.len());
    Json(WebhookResponse {
        replies: sink.replies.into_iter().map(WebhookReply::from).collect(),
    })
    .into_response()
}

/// Serve a rendered report; names that are not a report file name are 404
#[instrument(skip(state))]
async fn download_report(
    State(state): State<WebhookState>,
    Path(file_name): Path<String>,
) -> Response {
    let Some(period) = ReportPeriod::from_file_name(&file_name) else {
        debug!("Rejected report name {}", file_name);
        return StatusCode::NOT_FOUND.into_response();
    };

    let path = state.reports_dir.join(period.file_name());
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            info!("Serving report {} ({} bytes)", file_name, bytes.len());
            (
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", file_name),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Report {} has not been rendered", file_name);
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            warn!("Failed to read report {}: {}", path.display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
