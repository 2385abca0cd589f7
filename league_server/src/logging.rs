//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; `tracing-subscriber` picks those
//! records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directives when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// # Example
///
/// ```no_run
/// use league_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a request the engine refused on authorization grounds
pub fn log_security_event(event_type: &str, user_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}

/// Log a completed API request, flagging slow ones
pub fn log_api_request(method: &str, path: &str, status_code: u16, duration_ms: u64) {
    if duration_ms > 1000 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "Slow API request"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            "API request completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_log_helpers_do_not_panic() {
        log_security_event("forbidden", Some(7), "Test message");
        log_api_request("GET", "/health", 200, 3);
        log_api_request("POST", "/api/v1/tournaments/{id}/start", 200, 2500);
    }
}
