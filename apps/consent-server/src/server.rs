use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use cookie_preferences::CookiePreferencesModule;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

use crate::config::AppConfig;
use crate::cors;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn apply_trace_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id,
                    status = Empty,
                    latency_ms = Empty,
                )
            })
            .on_response(
                |res: &Response<Body>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("status", res.status().as_u16());
                    span.record("latency_ms", latency.as_millis());
                    tracing::debug!(parent: span, "request finished");
                },
            ),
    )
}

/// Full application router: preference API, health probe and middleware.
///
/// Requests pass `SetRequestId`, `PropagateRequestId`, Trace, Timeout,
/// `BodyLimit` and CORS before reaching a handler.
///
/// # Errors
/// Returns an error if the CORS configuration is invalid.
pub fn build_router(config: &AppConfig, module: &CookiePreferencesModule) -> Result<Router> {
    let mut router = module
        .register_rest(Router::new())
        .route("/health", get(health));

    if config.cors.enabled {
        router = router.layer(cors::build_cors_layer(&config.cors)?);
    }

    router = router.layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes));
    router = router.layer(DefaultBodyLimit::max(config.server.body_limit_bytes));

    router = router.layer(TimeoutLayer::with_status_code(
        StatusCode::GATEWAY_TIMEOUT,
        config.server.request_timeout,
    ));

    router = apply_trace_layer(router);

    router = router.layer(PropagateRequestIdLayer::x_request_id());
    router = router.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    Ok(router)
}

/// Serve `router` on `listener` until `cancel` fires, then drain in-flight requests.
///
/// # Errors
/// Returns an error if the server fails while running.
pub async fn serve(listener: TcpListener, router: Router, cancel: CancellationToken) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP server listening");

    let shutdown = async move {
        cancel.cancelled().await;
        tracing::info!("HTTP server shutting down gracefully");
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

/// Build the module and router from `config`, bind and serve.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run(config: &AppConfig, cancel: CancellationToken) -> Result<()> {
    let module = CookiePreferencesModule::new(&config.cookie_preferences);
    let router = build_router(config, &module)?;
    let listener = TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    serve(listener, router, cancel).await
}
