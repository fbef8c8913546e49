//! Deployment module

pub mod deployer;
pub mod fsm;
pub mod output;
pub mod runner;
pub mod state;

pub use deployer::{Deployer, DeploymentResult, Trigger};
pub use runner::{DeployProcess, DeployRunner, ProcessOutcome, ScriptOptions, ScriptRunner};
pub use state::{DeployFailure, DeploymentSnapshot, DeploymentState};
