//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health))]
pub struct HealthApi;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Always HTTP 200. `credential_configured: false` means every chat request
/// will be answered with the configuration-error reply.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = Value)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model":   state.config.model,
        "credential_configured": state.config.api_key.is_some(),
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::provider::OpenRouterProvider;

    fn state(config: Config) -> State<Arc<AppState>> {
        let provider = Arc::new(OpenRouterProvider::new(&config).unwrap());
        State(Arc::new(AppState::new(config, provider)))
    }

    #[tokio::test]
    async fn health_response_has_ok_status_and_version() {
        let Json(body) = get_health(state(Config::default())).await;
        assert_eq!(body["status"], "ok");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn health_reports_missing_credential() {
        let Json(body) = get_health(state(Config::default())).await;
        assert_eq!(body["credential_configured"], false);
        assert_eq!(body["model"], crate::config::DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn health_never_leaks_the_credential() {
        let config = Config {
            api_key: Some("sk-or-secret".into()),
            ..Config::default()
        };
        let Json(body) = get_health(state(config)).await;
        assert_eq!(body["credential_configured"], true);
        assert!(!body.to_string().contains("sk-or-secret"));
    }
}
