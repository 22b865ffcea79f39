use std::time::Duration;

use thiserror::Error;

use crate::replies;

/// Everything that can go wrong on either hop of the relay
/// (client -> endpoint, endpoint -> provider).
///
/// The distinction is kept until the outermost boundary, where each kind is
/// flattened into assistant-role text.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No provider credential is configured.
    #[error("provider credential is not configured")]
    MissingCredential,

    /// The remote side answered with a non-success HTTP status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// The body was received but did not have the expected shape.
    #[error("malformed response body: {0}")]
    MalformedResponse(String),

    /// The call exceeded its configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller tripped the cancellation signal.
    #[error("request cancelled")]
    Cancelled,
}

impl RelayError {
    /// Classify a transport error, reporting reqwest timeouts as
    /// [`RelayError::Timeout`] when the caller configured one.
    pub fn from_transport(err: reqwest::Error, timeout: Option<Duration>) -> Self {
        match timeout {
            Some(limit) if err.is_timeout() => RelayError::Timeout(limit),
            _ => RelayError::Http(err),
        }
    }

    /// Chat reply for failures the endpoint answers with HTTP 200; `None`
    /// means the failure takes the internal-error path.
    pub fn chat_reply(&self) -> Option<String> {
        match self {
            RelayError::MissingCredential => Some(replies::CONFIG_ERROR.to_owned()),
            RelayError::Status { detail, .. } => Some(replies::upstream_error(detail)),
            _ => None,
        }
    }
}
