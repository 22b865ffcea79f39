//! Unified server error type.
//!
//! Only failures outside the relay contract end up here: a body that is not
//! a valid relay request, or a relay outcome the endpoint does not report as
//! a chat reply. Every variant becomes HTTP 500 with the uniform
//! `{"message": ...}` body, so browsers always have something to show.
//!
//! **Security note:** full detail is logged; the client only sees the fixed
//! internal-error text.

use apa_core::{RelayError, RelayResponse, replies};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The request body could not be parsed as a relay request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The upstream call failed in a way that is not a handled chat reply.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match &self {
            ServerError::BadRequest(m) => error!(message = %m, "rejected chat request"),
            ServerError::Relay(e) => error!(error = %e, "upstream call failed"),
        }
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RelayResponse::new(replies::INTERNAL_ERROR)),
        )
            .into_response()
    }
}
