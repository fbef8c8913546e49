//! Finite State Machine for deployment attempts
//!
//! `Idle -> Launching -> Running -> {Succeeded, Failed, LaunchFailed}`.
//! The three outcome phases are resting phases: like `Idle`, they accept a
//! new `Trigger`. Only `Launching` and `Running` count as an active
//! deployment.

use serde::{Deserialize, Serialize};

/// Deployment phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPhase {
    /// No deployment has run yet
    Idle,

    /// Accepted, deploy process being spawned
    Launching,

    /// Deploy process running
    Running,

    /// Last attempt exited with code 0
    Succeeded,

    /// Last attempt exited non-zero, was killed, or timed out
    Failed,

    /// Last attempt could not start the deploy process
    LaunchFailed,
}

impl DeployPhase {
    /// Whether a deployment is in flight
    pub fn is_active(&self) -> bool {
        matches!(self, DeployPhase::Launching | DeployPhase::Running)
    }
}

/// Deployment event
#[derive(Debug, Clone)]
pub enum DeployEvent {
    /// A webhook was accepted for deployment
    Trigger,

    /// The deploy process was spawned
    Spawned,

    /// The deploy process could not be spawned
    SpawnFailed(String),

    /// The deploy process exited with code 0
    Exited,

    /// The deploy process exited unsuccessfully
    ExitFailed(String),

    /// The deploy process exceeded its deadline and was killed
    TimedOut(String),
}

/// Deployment FSM
#[derive(Debug, Clone)]
pub struct DeployFsm {
    phase: DeployPhase,
    error: Option<String>,
    consecutive_failures: u32,
}

impl DeployFsm {
    /// Create a new FSM in idle phase
    pub fn new() -> Self {
        Self {
            phase: DeployPhase::Idle,
            error: None,
            consecutive_failures: 0,
        }
    }

    /// Get current phase
    pub fn phase(&self) -> DeployPhase {
        self.phase
    }

    /// Error of the last failed attempt, cleared on success
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Failures since the last success
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Process an event and transition phase
    pub fn process(&mut self, event: DeployEvent) -> Result<(), String> {
        let new_phase = match (self.phase, &event) {
            (
                DeployPhase::Idle
                | DeployPhase::Succeeded
                | DeployPhase::Failed
                | DeployPhase::LaunchFailed,
                DeployEvent::Trigger,
            ) => DeployPhase::Launching,

            // From Launching
            (DeployPhase::Launching, DeployEvent::Spawned) => DeployPhase::Running,
            (DeployPhase::Launching, DeployEvent::SpawnFailed(err)) => {
                self.fail(err);
                DeployPhase::LaunchFailed
            }

            // From Running
            (DeployPhase::Running, DeployEvent::Exited) => {
                self.error = None;
                self.consecutive_failures = 0;
                DeployPhase::Succeeded
            }
            (DeployPhase::Running, DeployEvent::ExitFailed(err))
            | (DeployPhase::Running, DeployEvent::TimedOut(err)) => {
                self.fail(err);
                DeployPhase::Failed
            }

            (phase, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", phase, event));
            }
        };

        self.phase = new_phase;
        Ok(())
    }

    fn fail(&mut self, err: &str) {
        self.error = Some(err.to_string());
        self.consecutive_failures += 1;
    }
}

impl Default for DeployFsm {
    fn default() -> Self {
        Self::new()
    }
}
