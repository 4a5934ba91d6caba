//! CORS policy derived from `CORS_ORIGINS`.
//!
//! - Origins listed: only those origins, with the methods the app API uses
//! - Nothing listed, outside production: any origin
//! - Nothing listed, in production: no cross-origin access
//! - `*` anywhere in the list: any origin, in every environment

use std::time::Duration;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::http::request::X_REQUEST_ID;

pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config.cors_origins();

    let cors = if origins.iter().any(|origin| origin == "*") {
        if origins.len() > 1 {
            tracing::warn!("CORS_ORIGINS contains \"*\"; other listed origins are redundant");
        }
        permissive()
    } else if origins.is_empty() {
        if config.is_production() {
            tracing::warn!("CORS_ORIGINS not set in production; cross-origin requests are refused");
            CorsLayer::new()
        } else {
            permissive()
        }
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .expose_headers([HeaderName::from_static(X_REQUEST_ID)])
    };

    cors.max_age(Duration::from_secs(3600))
}

fn permissive() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}
