//! OpenRouter chat-completions client.

use std::time::Duration;

use apa_core::cancel::await_or_cancel;
use apa_core::{CancellationSignal, RelayError, replies};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ChatMessage, ChatProvider};
use crate::config::Config;

pub const TEMPERATURE: f32 = 0.7;
pub const MAX_TOKENS: u32 = 1500;

/// Sent as `X-Title` so requests are attributed to the app on OpenRouter.
pub const APP_TITLE: &str = "APA Agent - Project Management Learning Assistant";

/// Request body for `POST /api/v1/chat/completions`.
#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// The parts of a completion response the relay reads.
#[derive(Debug, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// Content of the first choice; empty content counts as absent.
    pub fn into_first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Best-effort `error.message` from a provider error body.
pub fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| replies::UNKNOWN_UPSTREAM_ERROR.to_owned())
}

#[derive(Debug)]
pub struct OpenRouterProvider {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    site_url: String,
    timeout: Duration,
}

impl OpenRouterProvider {
    pub fn new(config: &Config) -> Result<Self, RelayError> {
        let http = Client::builder()
            .user_agent(concat!("apa-server/", env!("CARGO_PKG_VERSION")))
            .timeout(config.upstream_timeout)
            .build()
            .map_err(RelayError::Http)?;

        if config.api_key.is_none() {
            warn!("OPENROUTER_API_KEY is not set; chat requests will report a configuration error");
        }

        Ok(Self {
            http,
            endpoint: config.provider_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            site_url: config.site_url.clone(),
            timeout: config.upstream_timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Option<String>, RelayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RelayError::MissingCredential)?;

        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
        };
        debug!(model = %self.model, messages = messages.len(), "calling provider");

        let pending = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send();
        let response = await_or_cancel(pending, cancellation)
            .await?
            .map_err(|e| RelayError::from_transport(e, Some(self.timeout)))?;

        let status = response.status();
        let text = await_or_cancel(response.text(), cancellation)
            .await?
            .map_err(|e| RelayError::from_transport(e, Some(self.timeout)))?;

        if !status.is_success() {
            let detail = error_detail(&text);
            warn!(status = status.as_u16(), detail = %detail, "provider returned an error");
            return Err(RelayError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| RelayError::MalformedResponse(e.to_string()))?;
        let content = parsed.into_first_content();
        info!(
            model = %self.model,
            output_len = content.as_ref().map_or(0, String::len),
            "provider completion done"
        );
        Ok(content)
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;
    use crate::provider::ProviderRole;

    #[derive(Debug, Default)]
    struct Captured {
        headers: Option<HeaderMap>,
        body: Option<Value>,
    }

    /// Throwaway upstream answering every request with `status` and `body`.
    async fn spawn_upstream(
        status: StatusCode,
        body: &'static str,
    ) -> (String, Arc<Mutex<Captured>>) {
        let captured: Arc<Mutex<Captured>> = Arc::default();
        let seen = captured.clone();
        let router = Router::new().route(
            "/api/v1/chat/completions",
            post(move |headers: HeaderMap, Json(payload): Json<Value>| {
                let seen = seen.clone();
                async move {
                    let mut guard = seen.lock().unwrap();
                    guard.headers = Some(headers);
                    guard.body = Some(payload);
                    (status, body).into_response()
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (format!("http://{addr}/api/v1/chat/completions"), captured)
    }

    fn provider(endpoint: String, api_key: Option<&str>) -> OpenRouterProvider {
        OpenRouterProvider::new(&Config {
            provider_url: endpoint,
            api_key: api_key.map(str::to_owned),
            site_url: "https://apa.example".into(),
            upstream_timeout: Duration::from_secs(5),
            ..Config::default()
        })
        .unwrap()
    }

    fn messages() -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(ProviderRole::System, "sys"),
            ChatMessage::new(ProviderRole::User, "Apa itu PERT?"),
        ]
    }

    #[tokio::test]
    async fn sends_fixed_parameters_and_headers() {
        let (endpoint, captured) = spawn_upstream(
            StatusCode::OK,
            r#"{"choices":[{"message":{"content":"PERT adalah ..."}}]}"#,
        )
        .await;

        let reply = provider(endpoint, Some("sk-test"))
            .complete(messages(), None)
            .await
            .unwrap();
        assert_eq!(reply.as_deref(), Some("PERT adalah ..."));

        let captured = captured.lock().unwrap();
        let headers = captured.headers.as_ref().unwrap();
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(headers["http-referer"], "https://apa.example");
        assert_eq!(headers["x-title"], APP_TITLE);
        assert!(
            headers["content-type"]
                .to_str()
                .unwrap()
                .starts_with("application/json")
        );

        let body = captured.body.as_ref().unwrap();
        assert_eq!(body["model"], crate::config::DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["stream"], false);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(
            body["messages"],
            json!([
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "Apa itu PERT?"}
            ])
        );
    }

    #[tokio::test]
    async fn empty_choices_is_no_content() {
        let (endpoint, _) = spawn_upstream(StatusCode::OK, r#"{"choices":[]}"#).await;
        let reply = provider(endpoint, Some("k")).complete(messages(), None).await;
        assert!(matches!(reply, Ok(None)));
    }

    #[tokio::test]
    async fn error_status_carries_provider_message() {
        let (endpoint, _) = spawn_upstream(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Rate limit exceeded","code":429}}"#,
        )
        .await;

        let err = provider(endpoint, Some("k"))
            .complete(messages(), None)
            .await
            .unwrap_err();
        match err {
            RelayError::Status { status, detail } => {
                assert_eq!(status, 429);
                assert_eq!(detail, "Rate limit exceeded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_error_body_is_unknown_error() {
        let (endpoint, _) = spawn_upstream(StatusCode::BAD_GATEWAY, "<html>502</html>").await;

        let err = provider(endpoint, Some("k"))
            .complete(messages(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RelayError::Status { status: 502, ref detail } if detail == replies::UNKNOWN_UPSTREAM_ERROR
        ));
    }

    #[tokio::test]
    async fn malformed_success_body_is_rejected() {
        let (endpoint, _) = spawn_upstream(StatusCode::OK, "{not json").await;
        let err = provider(endpoint, Some("k"))
            .complete(messages(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let (endpoint, captured) = spawn_upstream(StatusCode::OK, r#"{"choices":[]}"#).await;
        let provider = provider(endpoint, None);
        assert!(!provider.has_credential());

        let err = provider.complete(messages(), None).await.unwrap_err();

        assert!(matches!(err, RelayError::MissingCredential));
        assert!(captured.lock().unwrap().body.is_none());
    }

    #[test]
    fn error_detail_tolerates_missing_fields() {
        assert_eq!(error_detail(r#"{"error":{"message":"nope"}}"#), "nope");
        assert_eq!(error_detail(r#"{"error":{}}"#), replies::UNKNOWN_UPSTREAM_ERROR);
        assert_eq!(error_detail(r#"{}"#), replies::UNKNOWN_UPSTREAM_ERROR);
        assert_eq!(error_detail(""), replies::UNKNOWN_UPSTREAM_ERROR);
    }

    #[test]
    fn first_content_skips_missing_and_empty() {
        let parse = |s: &str| serde_json::from_str::<CompletionResponse>(s).unwrap();
        assert_eq!(parse(r#"{"choices":[{"message":{"content":""}}]}"#).into_first_content(), None);
        assert_eq!(parse(r#"{"choices":[{}]}"#).into_first_content(), None);
        assert_eq!(parse(r#"{}"#).into_first_content(), None);
        assert_eq!(
            parse(r#"{"choices":[{"message":{"content":"a"}},{"message":{"content":"b"}}]}"#)
                .into_first_content()
                .as_deref(),
            Some("a")
        );
    }
}
