//! Test doubles for the deploy runner

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::deploy::runner::{DeployProcess, DeployRunner, ProcessOutcome};

/// Process outcome for a normal exit with empty output
pub fn exited(code: i32) -> ProcessOutcome {
    ProcessOutcome::Exited {
        code: Some(code),
        stdout: String::new(),
        stderr: String::new(),
    }
}

/// Runner that never spawns anything.
///
/// A gated runner keeps each process "running" until `release` is called.
pub struct FakeRunner {
    outcome: Result<ProcessOutcome, String>,
    gate: Option<Arc<Notify>>,
    launches: AtomicUsize,
}

impl FakeRunner {
    pub fn immediate(outcome: ProcessOutcome) -> Self {
        Self {
            outcome: Ok(outcome),
            gate: None,
            launches: AtomicUsize::new(0),
        }
    }

    pub fn gated(outcome: ProcessOutcome) -> Self {
        Self {
            outcome: Ok(outcome),
            gate: Some(Arc::new(Notify::new())),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            gate: None,
            launches: AtomicUsize::new(0),
        }
    }

    /// Let one gated process finish
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeployRunner for FakeRunner {
    async fn launch(&self, _deployment_id: u64) -> Result<Box<dyn DeployProcess>, io::Error> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok(outcome) => Ok(Box::new(FakeProcess {
                outcome: outcome.clone(),
                gate: self.gate.clone(),
            })),
            Err(message) => Err(io::Error::new(io::ErrorKind::NotFound, message.clone())),
        }
    }
}

struct FakeProcess {
    outcome: ProcessOutcome,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl DeployProcess for FakeProcess {
    async fn wait(self: Box<Self>) -> ProcessOutcome {
        let FakeProcess { outcome, gate } = *self;
        if let Some(gate) = gate {
            gate.notified().await;
        }
        outcome
    }
}
