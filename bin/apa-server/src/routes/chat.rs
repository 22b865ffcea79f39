//! The relay endpoint (`POST /api/chat`).
//!
//! Builds `[system prompt] + last 10 history entries + [user message]`,
//! forwards it to the provider, and answers `{"message": ...}`. Missing
//! credentials and provider error statuses are reported as ordinary chat
//! replies with HTTP 200; everything else takes the HTTP 500 path in
//! [`ServerError`].

use std::sync::Arc;

use apa_core::{RelayError, RelayRequest, RelayResponse, replies};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, warn};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::prompt;
use crate::state::AppState;

/// Maximum accepted request body, history included.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(chat),
    components(schemas(RelayRequest, RelayResponse, apa_core::HistoryEntry, apa_core::Role))
)]
pub struct ChatApi;

/// Register the relay route.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/chat",
        post(chat).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
    )
}

/// Relay one user message to the provider.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = RelayRequest,
    responses(
        (status = 200, description = "Assistant reply, including handled failures", body = RelayResponse),
        (status = 500, description = "Unanticipated internal failure", body = RelayResponse),
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<RelayResponse>, ServerError> {
    // Oversized bodies are rejected by the limit layer; keep the `{message}` shape.
    let body =
        body.map_err(|e| ServerError::BadRequest(format!("unreadable chat request: {e}")))?;
    let request: RelayRequest = serde_json::from_slice(&body)
        .map_err(|e| ServerError::BadRequest(format!("invalid chat request: {e}")))?;
    if request.message.trim().is_empty() {
        return Err(ServerError::BadRequest("message is empty".into()));
    }

    let messages = prompt::build_messages(&request);
    debug!(
        history_len = request.history.len(),
        forwarded = messages.len(),
        message_len = request.message.len(),
        "chat request"
    );

    let outcome = state
        .provider
        .complete(messages, Some(&state.shutdown))
        .await;
    Ok(Json(RelayResponse::new(reply_for(outcome)?)))
}

/// Flatten a provider outcome into reply text, or the internal-error path.
pub fn reply_for(outcome: Result<Option<String>, RelayError>) -> Result<String, ServerError> {
    match outcome {
        Ok(Some(text)) => Ok(text),
        Ok(None) => {
            warn!("provider returned no content");
            Ok(replies::NO_RESPONSE.to_owned())
        }
        Err(e) => match e.chat_reply() {
            Some(reply) => {
                warn!(error = %e, "provider call failed");
                Ok(reply)
            }
            None => Err(ServerError::Relay(e)),
        },
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
