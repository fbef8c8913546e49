//! Single-flight deployment trigger

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::deploy::runner::{DeployRunner, ProcessOutcome};
use crate::deploy::state::{DeployFailure, DeploymentSnapshot, DeploymentState};

/// Result of one trigger, embedded in the webhook response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeploymentResult {
    fn new(success: bool, message: String, deployment_id: Option<u64>) -> Self {
        Self {
            success,
            message,
            skipped: false,
            deployment_id,
            code: None,
            stdout: None,
            stderr: None,
            error: None,
        }
    }

    /// Another deployment was already running
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::new(false, "Deployment already in progress".to_string(), None)
        }
    }

    /// Accepted and running in the background
    pub fn started(deployment_id: u64) -> Self {
        Self::new(
            true,
            format!("Deployment #{} started", deployment_id),
            Some(deployment_id),
        )
    }
}

/// Outcome of `Deployer::trigger`
#[derive(Debug)]
pub enum Trigger {
    /// A deployment was already in flight; nothing was started
    Skipped,

    /// A new deployment is running in its own task
    Started {
        deployment_id: u64,
        handle: JoinHandle<DeploymentResult>,
    },
}

/// Owns the deployment state and starts the deploy runner, one attempt at a time.
pub struct Deployer {
    state: RwLock<DeploymentState>,
    runner: Arc<dyn DeployRunner>,
}

impl Deployer {
    pub fn new(runner: Arc<dyn DeployRunner>) -> Self {
        Self {
            state: RwLock::new(DeploymentState::new()),
            runner,
        }
    }

    /// Current state for reporting
    pub async fn snapshot(&self) -> DeploymentSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn is_deploying(&self) -> bool {
        self.state.read().await.is_deploying()
    }

    /// Start a deployment unless one is in flight.
    ///
    /// The gate check and the state change happen under a single write
    /// guard. The attempt runs in a spawned task, so dropping the caller
    /// (e.g. a disconnected HTTP client) never cancels it.
    pub async fn trigger(self: &Arc<Self>) -> Trigger {
        let deployment_id = {
            let mut state = self.state.write().await;
            match state.begin() {
                Some(id) => id,
                None => {
                    warn!("Deployment already in progress, skipping...");
                    return Trigger::Skipped;
                }
            }
        };

        info!("Starting deployment #{}...", deployment_id);

        let deployer = Arc::clone(self);
        let handle = tokio::spawn(async move { deployer.execute(deployment_id).await });

        Trigger::Started {
            deployment_id,
            handle,
        }
    }

    /// Start a deployment and wait for its result.
    pub async fn deploy(self: &Arc<Self>) -> DeploymentResult {
        match self.trigger().await {
            Trigger::Skipped => DeploymentResult::skipped(),
            Trigger::Started {
                deployment_id,
                handle,
            } => match handle.await {
                Ok(result) => result,
                Err(e) => {
                    error!("Deployment #{} task failed: {}", deployment_id, e);
                    DeploymentResult {
                        error: Some(e.to_string()),
                        ..DeploymentResult::new(
                            false,
                            format!("Deployment #{} aborted", deployment_id),
                            Some(deployment_id),
                        )
                    }
                }
            },
        }
    }

    async fn execute(&self, deployment_id: u64) -> DeploymentResult {
        let process = match self.runner.launch(deployment_id).await {
            Ok(process) => process,
            Err(e) => {
                let message = format!("Failed to start deployment: {}", e);
                error!("{}", message);
                self.state.write().await.complete(
                    Some(DeployFailure::Launch {
                        error: e.to_string(),
                    }),
                    message.clone(),
                );
                return DeploymentResult {
                    error: Some(e.to_string()),
                    ..DeploymentResult::new(false, message, Some(deployment_id))
                };
            }
        };

        self.state.write().await.mark_spawned();
        debug!("Deployment #{} running", deployment_id);

        let outcome = process.wait().await;
        self.finish(deployment_id, outcome).await
    }

    async fn finish(&self, deployment_id: u64, outcome: ProcessOutcome) -> DeploymentResult {
        match outcome {
            ProcessOutcome::Exited {
                code: Some(0),
                ..
            } => {
                info!("Deployment #{} completed successfully", deployment_id);
                self.state
                    .write()
                    .await
                    .complete(None, "Deployment completed successfully".to_string());
                DeploymentResult::new(
                    true,
                    "Deployment completed successfully".to_string(),
                    Some(deployment_id),
                )
            }
            ProcessOutcome::Exited {
                code,
                stdout,
                stderr,
            } => {
                let message = match code {
                    Some(code) => format!("Deployment #{} failed with code {}", deployment_id, code),
                    None => format!("Deployment #{} was terminated by a signal", deployment_id),
                };
                error!("{}", message);
                debug!("STDOUT: {}", stdout);
                error!("STDERR: {}", stderr);

                self.state.write().await.complete(
                    Some(DeployFailure::Exit {
                        code,
                        stdout: stdout.clone(),
                        stderr: stderr.clone(),
                    }),
                    message.clone(),
                );
                DeploymentResult {
                    code,
                    stdout: Some(stdout),
                    stderr: Some(stderr),
                    ..DeploymentResult::new(false, message, Some(deployment_id))
                }
            }
            ProcessOutcome::TimedOut {
                after,
                stdout,
                stderr,
            } => {
                let message = format!(
                    "Deployment #{} timed out after {}s",
                    deployment_id,
                    after.as_secs_f64()
                );
                error!("{}", message);
                debug!("STDOUT: {}", stdout);
                error!("STDERR: {}", stderr);

                self.state.write().await.complete(
                    Some(DeployFailure::Timeout {
                        error: message.clone(),
                        stdout: stdout.clone(),
                        stderr: stderr.clone(),
                    }),
                    message.clone(),
                );
                DeploymentResult {
                    error: Some(message.clone()),
                    stdout: Some(stdout),
                    stderr: Some(stderr),
                    ..DeploymentResult::new(false, message, Some(deployment_id))
                }
            }
        }
    }
}
