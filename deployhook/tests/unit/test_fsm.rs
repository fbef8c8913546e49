//! FSM unit tests

use deployhook::deploy::fsm::{DeployEvent, DeployFsm, DeployPhase};

#[test]
fn test_fsm_initial_state() {
    let fsm = DeployFsm::new();
    assert_eq!(fsm.phase(), DeployPhase::Idle);
    assert!(fsm.error().is_none());
    assert_eq!(fsm.consecutive_failures(), 0);
}

#[test]
fn test_fsm_deploy_success_flow() {
    let mut fsm = DeployFsm::new();

    // Idle -> Launching
    fsm.process(DeployEvent::Trigger).unwrap();
    assert_eq!(fsm.phase(), DeployPhase::Launching);

    // Launching -> Running
    fsm.process(DeployEvent::Spawned).unwrap();
    assert_eq!(fsm.phase(), DeployPhase::Running);

    // Running -> Succeeded
    fsm.process(DeployEvent::Exited).unwrap();
    assert_eq!(fsm.phase(), DeployPhase::Succeeded);
}

#[test]
fn test_fsm_exit_failure_flow() {
    let mut fsm = DeployFsm::new();

    fsm.process(DeployEvent::Trigger).unwrap();
    fsm.process(DeployEvent::Spawned).unwrap();
    fsm.process(DeployEvent::ExitFailed("exit 1".to_string())).unwrap();

    assert_eq!(fsm.phase(), DeployPhase::Failed);
    assert_eq!(fsm.error(), Some("exit 1"));
    assert_eq!(fsm.consecutive_failures(), 1);
}

#[test]
fn test_fsm_launch_failure_flow() {
    let mut fsm = DeployFsm::new();

    fsm.process(DeployEvent::Trigger).unwrap();
    fsm.process(DeployEvent::SpawnFailed("ENOENT".to_string())).unwrap();

    assert_eq!(fsm.phase(), DeployPhase::LaunchFailed);
    assert!(!fsm.phase().is_active());
}

#[test]
fn test_fsm_retrigger_after_outcomes() {
    let mut fsm = DeployFsm::new();

    // First attempt fails
    fsm.process(DeployEvent::Trigger).unwrap();
    fsm.process(DeployEvent::SpawnFailed("error 1".to_string())).unwrap();

    // Second attempt fails
    fsm.process(DeployEvent::Trigger).unwrap();
    fsm.process(DeployEvent::Spawned).unwrap();
    fsm.process(DeployEvent::TimedOut("error 2".to_string())).unwrap();
    assert_eq!(fsm.consecutive_failures(), 2);
    assert_eq!(fsm.error(), Some("error 2"));

    // Third attempt succeeds and clears the error
    fsm.process(DeployEvent::Trigger).unwrap();
    fsm.process(DeployEvent::Spawned).unwrap();
    fsm.process(DeployEvent::Exited).unwrap();
    assert_eq!(fsm.consecutive_failures(), 0);
    assert!(fsm.error().is_none());
}

#[test]
fn test_fsm_invalid_transition() {
    let mut fsm = DeployFsm::new();

    // Cannot exit before spawning
    assert!(fsm.process(DeployEvent::Exited).is_err());
    assert!(fsm.process(DeployEvent::Spawned).is_err());

    fsm.process(DeployEvent::Trigger).unwrap();
    assert!(fsm.process(DeployEvent::Exited).is_err());
    assert_eq!(fsm.phase(), DeployPhase::Launching);
}
