use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;

/// CORS layer from `APA_CORS_ORIGINS`; wildcard unless at least one listed
/// origin parses.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    let Some(origins_str) = &config.cors_allowed_origins else {
        return layer.allow_origin(Any);
    };

    let origins: Vec<axum::http::HeaderValue> = origins_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
