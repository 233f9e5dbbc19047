//! Integration tests for `TokioCommandRunner` against a real shell.

#![cfg(unix)]
#![allow(clippy::expect_used)]

use std::time::{Duration, Instant};

use device_control::application::ports::CommandRunner;
use device_control::infra::command_runner::{TokioCommandRunner, ensure_success};

#[tokio::test]
async fn captures_stdout_and_stderr() {
    let runner = TokioCommandRunner::new(Duration::from_secs(10));

    let out = runner
        .run("sh", &["-c", "echo out; echo err >&2"])
        .await
        .expect("run");

    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "out\n");
    assert_eq!(String::from_utf8_lossy(&out.stderr), "err\n");
}

#[tokio::test]
async fn non_zero_exit_is_an_output_not_an_error() {
    let runner = TokioCommandRunner::new(Duration::from_secs(10));

    let out = runner
        .run("sh", &["-c", "echo broken >&2; exit 3"])
        .await
        .expect("run");

    assert_eq!(out.status.code(), Some(3));
    let err = ensure_success("sh", &out).expect_err("must fail");
    assert!(err.to_string().contains("broken"));
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let runner = TokioCommandRunner::default();
    let started = Instant::now();

    let err = runner
        .run_with_timeout("sleep", &["30"], Duration::from_millis(200))
        .await
        .expect_err("must time out");

    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn missing_program_fails_to_spawn() {
    let runner = TokioCommandRunner::default();

    let err = runner
        .run("definitely-not-a-real-program", &[])
        .await
        .expect_err("must fail");

    assert!(err.to_string().contains("failed to spawn"));
}
