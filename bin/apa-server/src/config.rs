//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

/// OpenRouter chat-completions endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Reasoning-capable model served for free by OpenRouter.
pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1:free";

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Runtime configuration for apa-server.
///
/// Every field except the provider credential has a default. A missing
/// credential is not replaced by anything: chat requests answer with the
/// configuration-error reply until one is set.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Bearer credential for the upstream provider (`OPENROUTER_API_KEY`).
    pub api_key: Option<String>,

    /// Public URL of the site, sent as `HTTP-Referer` upstream.
    pub site_url: String,

    /// Chat-completions endpoint of the upstream provider.
    pub provider_url: String,

    /// Model identifier requested upstream.
    pub model: String,

    /// Upper bound for one upstream call, connection to last byte.
    pub upstream_timeout: Duration,

    /// Comma-separated list of allowed CORS origins; wildcard when unset.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("APA_BIND", "0.0.0.0:3000"),
            log_level: env_or("APA_LOG", "info"),
            log_json: parse_bool("APA_LOG_JSON", false),
            api_key: std::env::var("OPENROUTER_API_KEY")
                .ok()
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty()),
            site_url: env_or("APA_SITE_URL", "http://localhost:3000"),
            provider_url: env_or("APA_PROVIDER_URL", DEFAULT_PROVIDER_URL),
            model: env_or("APA_MODEL", DEFAULT_MODEL),
            upstream_timeout: upstream_timeout(std::env::var("APA_UPSTREAM_TIMEOUT_SECS").ok()),
            cors_allowed_origins: std::env::var("APA_CORS_ORIGINS").ok(),
            enable_swagger: parse_bool("APA_ENABLE_SWAGGER", true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            log_level: "info".to_owned(),
            log_json: false,
            api_key: None,
            site_url: "http://localhost:3000".to_owned(),
            provider_url: DEFAULT_PROVIDER_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            cors_allowed_origins: None,
            enable_swagger: true,
        }
    }
}

// The credential must never reach the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("site_url", &self.site_url)
            .field("provider_url", &self.provider_url)
            .field("model", &self.model)
            .field("upstream_timeout", &self.upstream_timeout)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("enable_swagger", &self.enable_swagger)
            .finish()
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

// Called before tracing is initialised.
fn upstream_timeout(raw: Option<String>) -> Duration {
    let Some(raw) = raw else {
        return DEFAULT_UPSTREAM_TIMEOUT;
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            eprintln!(
                "WARN: APA_UPSTREAM_TIMEOUT_SECS='{raw}' is not a positive number of seconds; \
                 falling back to {}s",
                DEFAULT_UPSTREAM_TIMEOUT.as_secs()
            );
            DEFAULT_UPSTREAM_TIMEOUT
        }
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
