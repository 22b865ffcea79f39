//! Client side of the relay contract (`POST /api/chat`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::cancel::{CancellationSignal, await_or_cancel};
use crate::error::RelayError;
use crate::replies;
use crate::types::{RelayRequest, RelayResponse};

/// Sends one user message plus its history window and waits for the whole
/// answer.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Issue exactly one request. No retries, no partial output.
    async fn relay(
        &self,
        request: &RelayRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, RelayError>;

    /// Like [`relay`](RelayClient::relay), with every failure collapsed into
    /// [`replies::CLIENT_FALLBACK`]. Never fails.
    async fn send(
        &self,
        request: &RelayRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> String {
        match self.relay(request, cancellation).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "relay failed; substituting fallback reply");
                replies::CLIENT_FALLBACK.to_owned()
            }
        }
    }
}

/// [`RelayClient`] talking JSON over HTTP to an `apa-server` instance.
#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    http: Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl HttpRelayClient {
    /// Client without a timeout; a hung endpoint is only abandoned through
    /// the cancellation signal.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RelayError> {
        Self::build(endpoint.into(), None)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        Self::build(endpoint.into(), Some(timeout))
    }

    fn build(endpoint: String, timeout: Option<Duration>) -> Result<Self, RelayError> {
        let mut builder = Client::builder()
            .user_agent(concat!("apa-core/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(RelayError::Http)?;
        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn relay(
        &self,
        request: &RelayRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<String, RelayError> {
        debug!(
            endpoint = %self.endpoint,
            message_len = request.message.len(),
            history_len = request.history.len(),
            "relaying chat message"
        );

        let pending = self.http.post(&self.endpoint).json(request).send();
        let response = await_or_cancel(pending, cancellation)
            .await?
            .map_err(|e| RelayError::from_transport(e, self.timeout))?;

        let status = response.status();
        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .map_err(|e| RelayError::from_transport(e, self.timeout))?;

        if !status.is_success() {
            return Err(RelayError::Status {
                status: status.as_u16(),
                detail: body,
            });
        }

        let parsed: RelayResponse = serde_json::from_str(&body)
            .map_err(|e| RelayError::MalformedResponse(e.to_string()))?;
        Ok(parsed.message)
    }
}
