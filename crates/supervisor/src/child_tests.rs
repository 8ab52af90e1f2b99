// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sh(name: &str, script: &str) -> ChildSpec {
    ChildSpec::new(name, "/bin/sh").arg("-c").arg(script)
}

#[tokio::test]
async fn spawn_failure_is_an_error() {
    let (supervisor, _exits) = Supervisor::new("run-spawn", false);
    let err = supervisor
        .start(ChildSpec::new("ghost", "/nonexistent/definitely-not-a-binary"))
        .unwrap_err();
    assert!(matches!(err, SuperviseError::Spawn { .. }));
}

#[tokio::test]
async fn child_exit_is_reported_with_code() {
    let (supervisor, mut exits) = Supervisor::new("run-exit", false);
    let pid = supervisor.start(sh("flaky", "exit 7")).unwrap();

    let exit = exits.recv().await.unwrap();
    assert_eq!(exit.name, "flaky");
    assert_eq!(exit.pid, pid);
    assert_eq!(exit.code, Some(7));
    assert_eq!(supervisor.exit_code(pid), Some(7));
}

#[tokio::test]
async fn stop_terminates_a_cooperative_child() {
    let (supervisor, mut exits) = Supervisor::new("run-stop", false);
    let pid = supervisor.start(sh("sleeper", "sleep 30")).unwrap();

    let start = Instant::now();
    supervisor.stop(pid).await;
    assert!(start.elapsed() < STOP_GRACE, "TERM should beat the grace period");

    let exit = exits.recv().await.unwrap();
    assert_eq!(exit.pid, pid);
    assert!(!process::process_alive(pid));
}

#[tokio::test]
async fn stop_force_kills_a_term_ignoring_child() {
    let (supervisor, _exits) = Supervisor::new("run-kill", false);
    // Trap TERM so only KILL works.
    let pid = supervisor.start(sh("stubborn", "trap '' TERM; sleep 30")).unwrap();
    // Give the shell a moment to install the trap.
    tokio::time::sleep(Duration::from_millis(200)).await;

    supervisor.stop(pid).await;
    assert!(!process::process_alive(pid));
}

#[tokio::test]
async fn shutdown_all_is_idempotent_and_runs_cleanup_once() {
    let (supervisor, _exits) = Supervisor::new("run-fanout", false);
    supervisor.start(sh("a", "sleep 30")).unwrap();
    supervisor.start(sh("b", "sleep 30")).unwrap();

    let cleanups = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cleanups);
    supervisor.set_cleanup(Box::new(move || {
        assert!(!flag.swap(true, Ordering::SeqCst), "cleanup ran twice");
    }));

    supervisor.shutdown_all().await;
    supervisor.shutdown_all().await;
    assert!(cleanups.load(Ordering::SeqCst));
    assert!(supervisor.shutting_down());
}

#[tokio::test]
async fn detach_leaves_children_running() {
    let (supervisor, _exits) = Supervisor::new("run-detach", false);
    let pid = supervisor.start(sh("survivor", "sleep 30")).unwrap();

    let summary = supervisor.detach();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].1, pid);
    assert!(supervisor.is_detached());
    assert!(process::process_alive(pid));

    // Manual cleanup so the test suite does not leak sleepers.
    process::send_kill(pid);
}

#[tokio::test]
async fn run_id_reaches_the_child_environment() {
    let (supervisor, mut exits) = Supervisor::new("run-env-abc", false);
    supervisor
        .start(sh("probe", "test \"$OPENWORK_RUN_ID\" = run-env-abc"))
        .unwrap();

    let exit = exits.recv().await.unwrap();
    assert_eq!(exit.code, Some(0), "child should see the run id");
}
