//! Request ID middleware for tracing and debugging.
//!
//! Every request runs inside a span carrying its request id, so engine log
//! lines emitted while serving it can be correlated. The middleware also
//! records request metrics.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::{logging, metrics};

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generate or extract request ID from headers
fn get_or_generate_request_id(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Route template when the router matched one, raw path otherwise
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

/// Middleware to add request ID to all requests and responses
///
/// Extracts or generates the request id, runs the request inside a span
/// tagged with it, echoes it in the response headers, and records duration
/// and status.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = get_or_generate_request_id(request.headers());
    let method = request.method().to_string();
    let route = route_label(&request);
    let started = Instant::now();

    let span = tracing::info_span!("request", request_id = %request_id, method = %method, route = %route);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }

    let elapsed = started.elapsed();
    let status = response.status().as_u16();
    metrics::http_requests_total(&method, &route, status);
    metrics::http_request_duration_ms(&method, &route, elapsed.as_secs_f64() * 1000.0);
    logging::log_api_request(&method, &route, status, elapsed.as_millis() as u64);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::HeaderMap;

    #[test]
    fn test_get_or_generate_request_id_with_existing() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("test-id-123"));

        let request_id = get_or_generate_request_id(&headers);
        assert_eq!(request_id, "test-id-123");
    }

    #[test]
    fn test_get_or_generate_request_id_generates_new() {
        let headers = HeaderMap::new();
        let request_id = get_or_generate_request_id(&headers);

        // Should be a valid UUID
        assert!(Uuid::parse_str(&request_id).is_ok());
    }

    #[test]
    fn test_empty_request_id_is_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));
        assert!(Uuid::parse_str(&get_or_generate_request_id(&headers)).is_ok());
    }
}
