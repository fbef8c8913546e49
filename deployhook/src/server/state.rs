//! Server state

use std::sync::Arc;
use std::time::Instant;

use crate::app::options::WebhookOptions;
use crate::deploy::Deployer;
use crate::webhooks::SignatureVerifier;

/// Server state shared across handlers
pub struct ServerState {
    pub verifier: SignatureVerifier,
    pub deployer: Arc<Deployer>,
    pub webhook: WebhookOptions,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(webhook: WebhookOptions, deployer: Arc<Deployer>) -> Self {
        Self {
            verifier: SignatureVerifier::new(webhook.secret.clone()),
            deployer,
            webhook,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the server state was created
    pub fn uptime(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
