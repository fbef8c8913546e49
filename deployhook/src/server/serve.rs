//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::HookError;
use crate::server::handlers::{
    health_handler, method_not_allowed_handler, not_found_handler, status_handler,
    webhook_handler,
};
use crate::server::state::ServerState;
use crate::webhooks::{HEADER_EVENT, HEADER_SIGNATURE};

/// Build the router with all endpoints
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        // GitHub deliveries
        .route(
            "/webhook",
            post(webhook_handler).fallback(method_not_allowed_handler),
        )
        // Introspection
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        // State and middleware
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Answers every OPTIONS request as a preflight
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(HEADER_EVENT),
            HeaderName::from_static(HEADER_SIGNATURE),
        ])
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), HookError>>, HookError> {
    let app = build_router(state);

    let addr = format!("{}:{}", options.host, options.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| HookError::ServerError(format!("Unable to bind {}: {}", addr, e)))?;

    let port = listener
        .local_addr()
        .map(|a| a.port())
        .unwrap_or(options.port);
    info!("GitHub webhook server started on {}", addr);
    info!("Webhook endpoint: http://localhost:{}/webhook", port);
    info!("Status endpoint: http://localhost:{}/status", port);
    info!("Health endpoint: http://localhost:{}/health", port);

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| HookError::ServerError(e.to_string()))?;
        info!("Server closed");
        Ok(())
    });

    Ok(handle)
}
