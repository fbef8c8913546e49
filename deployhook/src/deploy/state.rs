//! Process-wide deployment state

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::deploy::fsm::{DeployEvent, DeployFsm, DeployPhase};

/// Why the most recent attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DeployFailure {
    /// The deploy process exited non-zero; `code` is `None` when killed by a signal
    Exit {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The deploy process outlived its deadline and was killed
    Timeout {
        error: String,
        stdout: String,
        stderr: String,
    },

    /// The deploy process could not be started
    Launch { error: String },
}

impl DeployFailure {
    fn event(&self, message: String) -> DeployEvent {
        match self {
            DeployFailure::Exit { .. } => DeployEvent::ExitFailed(message),
            DeployFailure::Timeout { .. } => DeployEvent::TimedOut(message),
            DeployFailure::Launch { .. } => DeployEvent::SpawnFailed(message),
        }
    }
}

/// Deployment state, owned by the `Deployer` and mutated only through it.
///
/// Invariants:
/// - at most one attempt is active at a time
/// - `deployment_count` never decreases
/// - `last_deployment` changes exactly once per finished attempt
#[derive(Debug, Default)]
pub struct DeploymentState {
    fsm: DeployFsm,
    last_deployment: Option<DateTime<Utc>>,
    last_error: Option<DeployFailure>,
    deployment_count: u64,
}

impl DeploymentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_deploying(&self) -> bool {
        self.fsm.phase().is_active()
    }

    pub fn phase(&self) -> DeployPhase {
        self.fsm.phase()
    }

    pub fn deployment_count(&self) -> u64 {
        self.deployment_count
    }

    pub fn last_deployment(&self) -> Option<DateTime<Utc>> {
        self.last_deployment
    }

    pub fn last_error(&self) -> Option<&DeployFailure> {
        self.last_error.as_ref()
    }

    /// Check-and-set of the single-flight gate.
    ///
    /// Returns the new deployment id, or `None` while another attempt is active.
    pub fn begin(&mut self) -> Option<u64> {
        if self.fsm.process(DeployEvent::Trigger).is_err() {
            return None;
        }
        self.deployment_count += 1;
        Some(self.deployment_count)
    }

    /// The deploy process is up
    pub fn mark_spawned(&mut self) {
        if let Err(e) = self.fsm.process(DeployEvent::Spawned) {
            error!("Deployment state out of sync: {}", e);
        }
    }

    /// Record a finished attempt. `None` means success.
    pub fn complete(&mut self, failure: Option<DeployFailure>, message: String) {
        let event = match &failure {
            None => DeployEvent::Exited,
            Some(failure) => failure.event(message),
        };
        if let Err(e) = self.fsm.process(event) {
            error!("Deployment state out of sync: {}", e);
        }
        self.last_deployment = Some(Utc::now());
        self.last_error = failure;
    }

    /// Serializable copy for `/status`
    pub fn snapshot(&self) -> DeploymentSnapshot {
        DeploymentSnapshot {
            last_deployment: self.last_deployment,
            is_deploying: self.is_deploying(),
            last_error: self.last_error.clone(),
            deployment_count: self.deployment_count,
            phase: self.fsm.phase(),
            consecutive_failures: self.fsm.consecutive_failures(),
        }
    }
}

/// Point-in-time view of the deployment state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSnapshot {
    pub last_deployment: Option<DateTime<Utc>>,
    pub is_deploying: bool,
    pub last_error: Option<DeployFailure>,
    pub deployment_count: u64,
    pub phase: DeployPhase,
    pub consecutive_failures: u32,
}
