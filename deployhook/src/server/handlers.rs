//! HTTP request handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::deploy::{DeploymentResult, DeploymentSnapshot, Trigger};
use crate::server::error::ApiError;
use crate::server::state::ServerState;
use crate::webhooks::{
    should_deploy, PushEvent, HEADER_DELIVERY, HEADER_EVENT, HEADER_SIGNATURE,
};

/// Webhook response
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<DeploymentResult>,
}

impl WebhookResponse {
    fn processed(deployment: DeploymentResult) -> Self {
        Self {
            message: "Webhook processed successfully".to_string(),
            deployment: Some(deployment),
        }
    }

    fn no_action() -> Self {
        Self {
            message: "Webhook received but no action taken".to_string(),
            deployment: None,
        }
    }
}

/// GitHub webhook handler.
///
/// The body is read up to `max_payload_size` bytes and authenticated before
/// it is parsed. Only a push to the deploy ref starts a deployment; every
/// other authenticated event gets a 200 with no action taken.
///
/// Deployment failures are reported inside the 200 response, not through
/// the status code.
pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<WebhookResponse>, ApiError> {
    let body = axum::body::to_bytes(body, state.webhook.max_payload_size)
        .await
        .map_err(|e| {
            warn!(
                "Webhook body rejected (limit {} bytes): {}",
                state.webhook.max_payload_size, e
            );
            ApiError::PayloadTooLarge
        })?;

    let event = header_str(&headers, HEADER_EVENT);
    let delivery_id = header_str(&headers, HEADER_DELIVERY).unwrap_or("unknown");
    info!(
        delivery_id = %delivery_id,
        "Received {} webhook from GitHub",
        event.unwrap_or("unknown")
    );

    let signature = header_str(&headers, HEADER_SIGNATURE);
    if !state.verifier.check(&body, signature).is_accepted() {
        error!(delivery_id = %delivery_id, "Invalid webhook signature");
        return Err(ApiError::InvalidSignature);
    }

    let payload: Value = serde_json::from_slice(&body).map_err(|e| {
        error!(delivery_id = %delivery_id, "Error processing webhook: {}", e);
        ApiError::InvalidPayload
    })?;

    let push = PushEvent::new(&payload);
    let deploy_ref = state.webhook.deploy_ref.as_str();
    if !should_deploy(event, push.git_ref(), deploy_ref) {
        info!(
            "Ignoring {} event (not a push to {})",
            event.unwrap_or("unknown"),
            deploy_ref
        );
        return Ok(Json(WebhookResponse::no_action()));
    }

    info!(
        "Push to {} detected. Commit: {}",
        deploy_ref,
        push.short_commit()
    );

    let deployment = if state.webhook.wait_for_deployment {
        state.deployer.deploy().await
    } else {
        match state.deployer.trigger().await {
            Trigger::Skipped => DeploymentResult::skipped(),
            Trigger::Started { deployment_id, .. } => DeploymentResult::started(deployment_id),
        }
    };

    Ok(Json(WebhookResponse::processed(deployment)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Any method other than POST on the webhook path
pub async fn method_not_allowed_handler() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Unknown paths
pub async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub deployment: DeploymentSnapshot,
    /// Seconds since startup
    pub uptime: f64,
    pub timestamp: DateTime<Utc>,
}

/// Status handler
pub async fn status_handler(State(state): State<Arc<ServerState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running".to_string(),
        deployment: state.deployer.snapshot().await,
        uptime: state.uptime(),
        timestamp: Utc::now(),
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check handler
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    })
}
