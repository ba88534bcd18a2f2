use std::time::Duration;

use anyhow::{Result, bail};
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

fn is_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

/// Build the CORS layer for the preference API.
///
/// Entries that do not parse as origins, methods or header names are skipped
/// with a warning.
///
/// # Errors
/// Returns an error if a wildcard origin is combined with credentials, which
/// browsers reject.
pub fn build_cors_layer(cfg: &CorsConfig) -> Result<CorsLayer> {
    let wildcard_origin = is_wildcard(&cfg.allowed_origins);
    if wildcard_origin && cfg.allow_credentials {
        bail!("CORS misconfiguration: allowed_origins ['*'] cannot be combined with allow_credentials");
    }

    let mut layer = CorsLayer::new();

    if wildcard_origin {
        tracing::warn!("CORS allows any origin; set cors.allowed_origins for production");
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = cfg
            .allowed_origins
            .iter()
            .filter_map(|o| {
                HeaderValue::from_str(o)
                    .inspect_err(|_| tracing::warn!(origin = %o, "ignoring invalid CORS origin"))
                    .ok()
            })
            .collect();
        layer = layer.allow_origin(origins);
    }

    if is_wildcard(&cfg.allowed_methods) {
        layer = layer.allow_methods(Any);
    } else {
        let methods: Vec<Method> = cfg
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        layer = layer.allow_methods(methods);
    }

    if is_wildcard(&cfg.allowed_headers) {
        layer = layer.allow_headers(Any);
    } else {
        let headers: Vec<HeaderName> = cfg
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer = layer.allow_headers(headers);
    }

    if cfg.allow_credentials {
        layer = layer.allow_credentials(true);
    }
    if cfg.max_age_seconds > 0 {
        layer = layer.max_age(Duration::from_secs(cfg.max_age_seconds));
    }

    Ok(layer)
}
