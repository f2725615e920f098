use super::*;
use crate::output::Entity;
use std::time::Instant;

fn sh_harness() -> E2eHarness {
    E2eHarness::new(HarnessConfig::from_vars([
        ("ANYR_BIN", "/bin/sh"),
        ("PATH", "/usr/bin:/bin"),
        ("ANYTYPE_TEST_URL", "http://127.0.0.1:31012"),
    ]))
    .unwrap()
}

#[test]
fn test_command_output() {
    let output = CommandOutput {
        stdout: "Hello World".to_string(),
        stderr: "".to_string(),
        exit_code: 0,
    };

    assert!(output.success());
    assert!(output.stdout_contains("Hello"));
    assert!(!output.stdout_contains("Goodbye"));
}

#[test]
fn test_parse_json_rejects_nonzero_exit() {
    let output = CommandOutput {
        stdout: "partial".to_string(),
        stderr: "space not found".to_string(),
        exit_code: 2,
    };

    let err = output.parse_json::<Entity>("type get s1 page").unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, E2eError::CommandFailed { exit_code: 2, .. }));
    assert!(message.contains("type get s1 page"), "{}", message);
    assert!(message.contains("stdout: partial"), "{}", message);
    assert!(message.contains("stderr: space not found"), "{}", message);
}

#[test]
fn test_parse_json_rejects_garbage() {
    let output = CommandOutput {
        stdout: "not json".to_string(),
        stderr: "warning: deprecated flag".to_string(),
        exit_code: 0,
    };

    let err = output.parse_json::<Entity>("type list s1").unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, E2eError::InvalidOutput { .. }));
    assert!(message.contains("invalid json for type list s1"), "{}", message);
    assert!(message.contains("stderr: warning: deprecated flag"), "{}", message);
}

#[test]
fn test_missing_binary_is_environment_unavailable() {
    let err = E2eHarness::new(HarnessConfig::from_vars([("PATH", "")])).unwrap_err();
    assert!(matches!(err, E2eError::EnvironmentUnavailable(_)));
}

#[tokio::test]
async fn test_run_cli_keeps_nonzero_exit() {
    let harness = sh_harness();

    let output = harness
        .run_cli(&["-c", "echo out; echo err >&2; exit 3"])
        .await
        .unwrap();

    assert_eq!(output.exit_code, 3);
    assert_eq!(output.stdout, "out\n");
    assert_eq!(output.stderr, "err\n");
}

#[tokio::test]
async fn test_run_cli_applies_env_overrides() {
    let harness = sh_harness();

    let output = harness
        .run_cli(&["-c", "printf %s \"$ANYTYPE_URL\""])
        .await
        .unwrap();

    output.assert_success();
    assert_eq!(output.stdout, "http://127.0.0.1:31012");
}

#[tokio::test]
async fn test_run_json_appends_flag() {
    let harness = sh_harness();

    // with `sh -c`, the trailing --json becomes $0
    let entity: Entity = harness
        .run_json(&["-c", "printf '{\"id\":\"%s\"}' \"$0\""])
        .await
        .unwrap();

    assert_eq!(entity.id, JSON_FLAG);
}

#[tokio::test]
async fn test_timeout_kills_child() {
    let mut harness = sh_harness();
    harness.timeout = Some(Duration::from_millis(200));

    let err = harness.run_cli(&["-c", "sleep 5"]).await.unwrap_err();
    assert!(matches!(err, E2eError::Timeout(_)));
}

#[test]
fn test_missing_space_id_is_a_skip() {
    let harness = E2eHarness::new(HarnessConfig::from_vars([
        ("ANYR_BIN", "/bin/sh"),
        ("ANYTYPE_TEST_SPACE_ID", ""),
    ]))
    .unwrap();

    assert_eq!(harness.space_id(), None);
    assert_eq!(harness.require_space_id("test_missing_space_id_is_a_skip"), None);
}

#[test]
fn test_blocking_timeout_kills_child() {
    let mut harness = sh_harness();
    harness.timeout = Some(Duration::from_millis(200));

    let start = Instant::now();
    let err = harness.run_cli_blocking(&["-c", "sleep 5"]).unwrap_err();

    assert!(matches!(err, E2eError::Timeout(_)));
    assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
}

#[test]
fn test_blocking_within_timeout_keeps_output() {
    let mut harness = sh_harness();
    harness.timeout = Some(Duration::from_secs(10));

    let output = harness
        .run_cli_blocking(&["-c", "echo deleted; echo gone >&2; exit 4"])
        .unwrap();

    assert_eq!(output.exit_code, 4);
    assert_eq!(output.stdout, "deleted\n");
    assert_eq!(output.stderr, "gone\n");
}

#[test]
fn test_run_cli_blocking() {
    let harness = sh_harness();

    let output = harness.run_cli_blocking(&["-c", "exit 1"]).unwrap();
    assert!(!output.success());
}
