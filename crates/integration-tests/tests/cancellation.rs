//! Cancellation and timeout: the child is stopped and reaped, never leaked

#![cfg(unix)]

mod common;

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use common::{shell_function, shell_function_with};
use pyeval_core::application::FunctionRegistry;
use pyeval_core::cancel::cancel_channel;
use pyeval_core::domain::{ArgumentBundle, FuncError, InvocationConfig};
use pyeval_core::port::Function;
use pyeval_core::AppError;

fn pid_file() -> std::path::PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pyeval-test-{}-{}.pid", std::process::id(), nanos))
}

/// True while the pid exists, including as an unreaped zombie
fn pid_exists(pid: &str) -> bool {
    Command::new("kill")
        .args(["-0", pid])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// True while the pid is alive and not a zombie. An orphaned grandchild is
/// reaped by init, not by us, so its zombie counts as stopped.
#[cfg(target_os = "linux")]
fn pid_running(pid: &str) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .map(|rest| !rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

async fn wait_for_pid(path: &std::path::Path) -> String {
    for _ in 0..100 {
        if let Ok(pid) = std::fs::read_to_string(path) {
            let pid = pid.trim().to_string();
            if !pid.is_empty() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("child never wrote its pid");
}

#[tokio::test]
async fn test_cancel_terminates_and_reaps_child() {
    let path = pid_file();
    let text = format!("echo $$ > {}; exec sleep 30", path.display());
    let function = Arc::new(shell_function());
    let (tx, token) = cancel_channel();

    let task = {
        let function = function.clone();
        let args = ArgumentBundle::with_string("script", text.clone());
        tokio::spawn(async move { function.run(&args, token).await })
    };

    let pid = wait_for_pid(&path).await;
    assert!(pid_exists(&pid));

    let start = Instant::now();
    tx.cancel();
    let err = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("cancelled call should return")
        .unwrap()
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(err.to_string().contains(&text));
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(!pid_exists(&pid), "child {} should be gone", pid);

    let _ = std::fs::remove_file(&path);
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_cancel_stops_grandchildren() {
    let path = pid_file();
    let text = format!("sleep 30 & echo $! > {}; wait", path.display());
    let function = Arc::new(shell_function());
    let (tx, token) = cancel_channel();

    let task = {
        let function = function.clone();
        let args = ArgumentBundle::with_string("script", text);
        tokio::spawn(async move { function.run(&args, token).await })
    };

    let grandchild = wait_for_pid(&path).await;
    assert!(pid_running(&grandchild));

    tx.cancel();
    let err = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("cancelled call should return")
        .unwrap()
        .unwrap_err();
    assert!(err.is_cancelled());

    let mut stopped = false;
    for _ in 0..50 {
        if !pid_running(&grandchild) {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(stopped, "grandchild {} should be stopped", grandchild);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_timeout_is_execution_failure() {
    let function = shell_function_with(
        InvocationConfig::new("/bin/sh", "-c", "Shell").with_timeout(Duration::from_millis(200)),
    );
    let (_tx, token) = cancel_channel();

    let start = Instant::now();
    let err = function
        .run(&ArgumentBundle::with_string("script", "sleep 30"), token)
        .await
        .unwrap_err();

    assert!(matches!(err, FuncError::Execution { position: 0, .. }));
    assert_eq!(err.to_string(), "Error running Shell script: sleep 30");
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_fast_script_unaffected_by_timeout() {
    let function = shell_function_with(
        InvocationConfig::new("/bin/sh", "-c", "Shell").with_timeout(Duration::from_secs(10)),
    );
    let (_tx, token) = cancel_channel();

    let result = function
        .run(&ArgumentBundle::with_string("script", "echo quick"), token)
        .await
        .unwrap();

    assert_eq!(result.get_str("stdout"), Some("quick\n"));
}

#[tokio::test]
async fn test_registry_call_cancellation() {
    let mut registry = FunctionRegistry::new();
    registry.register(Arc::new(shell_function())).unwrap();
    let (tx, token) = cancel_channel();

    let task = tokio::spawn(async move {
        registry
            .call(
                "sheval",
                ArgumentBundle::with_string("script", "sleep 30"),
                token,
            )
            .await
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    tx.cancel();

    let err = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("cancelled call should return")
        .unwrap()
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Function(FuncError::Cancelled { position: 0, .. })
    ));
}
