use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

use crate::auth::USER_ID_HEADER;

const DEFAULT_ORIGINS: &str = "http://localhost:3000";

/// Build a CORS layer from the `MOODLOG_CORS_ORIGINS` env var.
///
/// - Origins: comma-separated list (default: `http://localhost:3000`)
/// - Methods: GET, POST, DELETE, OPTIONS
/// - Headers: Content-Type, x-user-id
/// - Max age: 3600s
pub fn build_cors_layer() -> CorsLayer {
    let origins_str =
        std::env::var("MOODLOG_CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string());

    CorsLayer::new()
        .allow_origin(parse_origins(&origins_str))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    let mut origins: Vec<HeaderValue> = Vec::new();
    for origin in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let Ok(value) = origin.parse::<HeaderValue>() else {
            tracing::warn!(origin = origin, "Ignoring unparseable CORS origin");
            continue;
        };
        if !origins.contains(&value) {
            origins.push(value);
        }
    }
    origins
}
