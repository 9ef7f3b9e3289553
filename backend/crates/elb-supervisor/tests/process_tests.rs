#![cfg(unix)]

mod common;

use common::{
    COOPERATIVE_SERVER, CRASHING_SERVER, LogCapture, RECORDING_SERVER, STUBBORN_SERVER,
    ScriptedServer, TEST_GRACE_MS, wait_for_state,
};

use elb_supervisor::{ServiceFault, ServiceState, StopOutcome};

use std::time::{Duration, Instant};

use googletest::assert_that;
use googletest::prelude::{eq, none, some};

async fn file_contents(path: std::path::PathBuf) -> String {
    for _ in 0..200 {
        if let Ok(contents) = std::fs::read_to_string(&path)
            && contents.lines().count() >= 3
        {
            return contents;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} was never written", path.display());
}

#[tokio::test]
async fn given_cooperative_process_when_stop_then_graceful() {
    // Given
    let server = ScriptedServer::development(COOPERATIVE_SERVER);
    let supervisor = server.supervisor();
    let snapshot = supervisor.start().await;
    assert_that!(snapshot.state, eq(ServiceState::Running));
    assert!(snapshot.unit.as_deref().is_some_and(|u| u.starts_with("pid=")));

    // When
    let outcome = supervisor.stop().await;

    // Then
    assert_that!(outcome, eq(StopOutcome::Graceful));
    let snapshot = supervisor.current_state();
    assert_that!(snapshot.state, eq(ServiceState::Stopped));
    assert_that!(snapshot.last_error, none());
}

#[tokio::test]
async fn given_process_ignoring_sigterm_when_stop_then_killed() {
    // Given
    let server = ScriptedServer::development(STUBBORN_SERVER);
    let supervisor = server.supervisor();
    supervisor.start().await;
    // Let the shell install its trap before it is signalled
    tokio::time::sleep(Duration::from_millis(200)).await;

    // When
    let started = Instant::now();
    let outcome = supervisor.stop().await;

    // Then
    assert_that!(outcome, eq(StopOutcome::Forced));
    assert!(started.elapsed() >= Duration::from_millis(TEST_GRACE_MS));
    let snapshot = supervisor.current_state();
    assert_that!(snapshot.state, eq(ServiceState::Stopped));
    assert_that!(
        snapshot.last_error,
        some(eq(&ServiceFault::ShutdownTimeout {
            grace_ms: TEST_GRACE_MS
        }))
    );
}

#[tokio::test]
async fn given_process_ignoring_sigterm_when_stop_then_kill_logged_and_restart_allowed() {
    // Given
    let logs = LogCapture::default();
    let _guard = logs.install();
    let server = ScriptedServer::development(STUBBORN_SERVER);
    let supervisor = server.supervisor();
    let first = supervisor.start().await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    // When
    supervisor.stop().await;
    let second = supervisor.start().await;

    // Then
    let contents = logs.contents();
    assert!(contents.contains("graceful stop requested"), "{contents}");
    assert!(contents.contains("Sending SIGTERM"), "{contents}");
    assert!(contents.contains("forced kill"), "{contents}");
    assert!(contents.contains("stopped"), "{contents}");
    assert!(!contents.contains("no exit acknowledged"), "{contents}");
    assert_that!(second.state, eq(ServiceState::Running));
    assert!(second.unit != first.unit);

    supervisor.stop().await;
}

#[tokio::test]
async fn given_process_exits_by_itself_when_running_then_failed_with_exit_code() {
    // Given
    let server = ScriptedServer::development(CRASHING_SERVER);
    let supervisor = server.supervisor();

    // When
    supervisor.start().await;
    let snapshot = wait_for_state(&supervisor, ServiceState::Failed).await;

    // Then
    assert!(matches!(
        snapshot.last_error,
        Some(ServiceFault::UnexpectedTermination { code: Some(3), .. })
    ));
    assert_that!(snapshot.unit, none());
}

#[tokio::test]
async fn given_crashed_process_when_start_again_then_new_pid() {
    // Given
    let server = ScriptedServer::development(CRASHING_SERVER);
    let supervisor = server.supervisor();
    let first = supervisor.start().await;
    wait_for_state(&supervisor, ServiceState::Failed).await;

    // When
    let second = supervisor.start().await;

    // Then
    assert_that!(second.state, eq(ServiceState::Running));
    assert_that!(second.attempt, eq(first.attempt + 1));
    assert!(second.unit.is_some());
    assert!(second.unit != first.unit);

    supervisor.on_process_exit().await;
}

#[tokio::test]
async fn given_installed_layout_when_started_then_command_line_cwd_and_env_are_set() {
    // Given
    let server = ScriptedServer::installed(RECORDING_SERVER);
    let supervisor = server.supervisor();
    let root = server.config.working_dir().to_path_buf();

    // When
    supervisor.start().await;
    let invocation = file_contents(root.join("invocation.txt")).await;

    // Then
    let lines: Vec<&str> = invocation.lines().collect();
    let cwd = std::fs::canonicalize(lines[0]).unwrap();
    assert_that!(cwd, eq(&std::fs::canonicalize(&root).unwrap()));
    assert_that!(
        lines[1].to_string(),
        eq(&format!(
            "--model {} --port {} --host 127.0.0.1 --n_gpu_layers -1",
            server.config.model.display(),
            server.config.port
        ))
    );
    assert_that!(lines[2].to_string(), eq(&root.display().to_string()));

    supervisor.stop().await;
}

#[tokio::test]
async fn given_running_process_when_on_process_exit_then_no_process_left() {
    // Given
    let server = ScriptedServer::development(COOPERATIVE_SERVER);
    let supervisor = server.supervisor();
    supervisor.start().await;
    let pid: u32 = supervisor
        .current_state()
        .unit
        .and_then(|u| u.strip_prefix("pid=").and_then(|p| p.parse().ok()))
        .unwrap();
    assert!(common::process_exists(pid));

    // When
    let outcome = supervisor.on_process_exit().await;

    // Then
    assert_that!(outcome, eq(StopOutcome::Graceful));
    assert!(!common::process_exists(pid), "child {pid} outlived the supervisor");
}

#[tokio::test]
async fn given_missing_launcher_when_start_then_nothing_spawned() {
    // Given
    let server = ScriptedServer::development(COOPERATIVE_SERVER);
    std::fs::remove_file(&server.config.launcher).unwrap();
    let supervisor = server.supervisor();

    // When
    let snapshot = supervisor.start().await;

    // Then
    assert_that!(snapshot.state, eq(ServiceState::Failed));
    assert!(matches!(
        snapshot.last_error,
        Some(ServiceFault::MissingResource { .. })
    ));
    assert_that!(snapshot.unit, none());
}
