//! Per-request trace ID and access logging.

use std::time::Instant;

use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::BodyExt;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Only bodies with a known size at or below this are buffered and logged.
const BODY_LOG_LIMIT: usize = 1024;

/// Accept a caller-supplied `x-trace-id` UUID or mint one, run the request
/// inside a span carrying it, and echo it on the response.
pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let (parts, body) = req.into_parts();
        let body = buffer_and_log("request", &parts.headers, body).await;
        let mut req = Request::from_parts(parts, body);
        if let Some(value) = &header_value {
            req.headers_mut().insert(X_TRACE_ID, value.clone());
        }

        let response = next.run(req).await;

        let (parts, body) = response.into_parts();
        let body = buffer_and_log("response", &parts.headers, body).await;
        let mut response = Response::from_parts(parts, body);
        if let Some(value) = header_value {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

/// Log small JSON bodies at debug level. Anything else, including bodies of
/// unknown length, passes through unbuffered.
async fn buffer_and_log(direction: &str, headers: &HeaderMap, body: Body) -> Body {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let upper = HttpBody::size_hint(&body).upper();

    let small = upper.is_some_and(|n| n <= BODY_LOG_LIMIT as u64);
    if !(small && content_type.contains("application/json")) {
        if upper != Some(0) {
            debug!(direction, content_type, size = ?upper, "body not logged");
        }
        return body;
    }

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(direction, error = %e, "failed to buffer body");
            return Body::empty();
        }
    };
    if let Ok(text) = std::str::from_utf8(&bytes) {
        debug!(direction, body = text, "body");
    }
    Body::from(bytes)
}
