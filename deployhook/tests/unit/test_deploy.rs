//! End-to-end deployment tests with a real deploy script

#![cfg(unix)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use deployhook::deploy::fsm::DeployPhase;
use deployhook::deploy::{DeployFailure, Deployer, ScriptOptions, ScriptRunner, Trigger};

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("deploy.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", body).unwrap();
    path
}

fn deployer(script: PathBuf, timeout: Option<Duration>) -> Arc<Deployer> {
    let runner = ScriptRunner::new(ScriptOptions {
        shell: "sh".to_string(),
        script,
        timeout,
        drain_grace: Duration::from_secs(2),
        ..Default::default()
    });
    Arc::new(Deployer::new(Arc::new(runner)))
}

#[tokio::test]
async fn test_script_success_updates_state() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "echo deployed");
    let deployer = deployer(script, Some(Duration::from_secs(10)));

    let result = deployer.deploy().await;
    assert!(result.success);

    let snapshot = deployer.snapshot().await;
    assert_eq!(snapshot.deployment_count, 1);
    assert_eq!(snapshot.phase, DeployPhase::Succeeded);
    assert!(snapshot.last_deployment.is_some());
}

#[tokio::test]
async fn test_missing_script_is_exit_failure() {
    let dir = tempfile::tempdir().unwrap();
    let deployer = deployer(dir.path().join("missing.sh"), Some(Duration::from_secs(10)));

    let result = deployer.deploy().await;
    assert!(!result.success);
    assert!(result.code.is_some());
    assert_ne!(result.code, Some(0));

    let snapshot = deployer.snapshot().await;
    assert!(matches!(snapshot.last_error, Some(DeployFailure::Exit { .. })));
}

#[tokio::test]
async fn test_missing_working_dir_is_launch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "exit 0");
    let runner = ScriptRunner::new(ScriptOptions {
        shell: "sh".to_string(),
        script,
        working_dir: Some(dir.path().join("nope")),
        ..Default::default()
    });
    let deployer = Arc::new(Deployer::new(Arc::new(runner)));

    let result = deployer.deploy().await;
    assert!(!result.success);
    assert!(result.message.starts_with("Failed to start deployment: "));

    let snapshot = deployer.snapshot().await;
    assert!(!snapshot.is_deploying);
    assert!(matches!(snapshot.last_error, Some(DeployFailure::Launch { .. })));
}

#[tokio::test]
async fn test_hung_script_is_killed_and_gate_released() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "exec sleep 60");
    let deployer = deployer(script, Some(Duration::from_millis(200)));

    let Trigger::Started { handle, .. } = deployer.trigger().await else {
        panic!("expected deployment to start");
    };
    let result = handle.await.unwrap();
    assert!(!result.success);
    assert!(result.message.contains("timed out"));

    let snapshot = deployer.snapshot().await;
    assert!(!snapshot.is_deploying);
    assert_eq!(snapshot.phase, DeployPhase::Failed);
    assert!(matches!(snapshot.last_error, Some(DeployFailure::Timeout { .. })));

    // The gate is open again
    assert!(matches!(deployer.trigger().await, Trigger::Started { .. }));
}
