//! Integration tests for the `matebridge` CLI binary.
//!
//! Argument parsing, help output, completions, config handling, and
//! one-shot commands against a mocked TeslaMate API.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `matebridge` binary with env isolation.
///
/// Clears all `MATEBRIDGE_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn matebridge_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("matebridge");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("MATEBRIDGE_PROFILE")
        .env_remove("MATEBRIDGE_SERVER_URL")
        .env_remove("MATEBRIDGE_ACCESS_TOKEN")
        .env_remove("MATEBRIDGE_OUTPUT")
        .env_remove("MATEBRIDGE_TIMEOUT")
        .env_remove("MATEBRIDGE_LOG_FILE");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Mount the endpoints a one-shot command touches before its own call.
async fn mount_fleet(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "pong" })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/cars"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "cars": [{
                "car_id": 1,
                "name": "Blue",
                "car_details": { "vin": "5YJ3E7EAXKF000001", "model": "3" }
            }] }
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/cars/1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "status": {
                "state": "online",
                "battery_details": { "battery_level": 71 }
            } }
        })))
        .mount(server)
        .await;
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = matebridge_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("TeslaMate")
                .and(predicate::str::contains("run"))
                .and(predicate::str::contains("status"))
                .and(predicate::str::contains("catalog")),
        );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("matebridge"));
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = matebridge_cmd(home.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn test_status_without_config_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .arg("status")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_unknown_command_fails_before_network() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args([
            "--server-url",
            "http://127.0.0.1:9",
            "--access-token",
            "t",
            "command",
            "VIN",
            "launch_rocket",
        ])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("launch_rocket"));
}

#[test]
fn test_invalid_setting_value() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args([
            "--server-url",
            "http://127.0.0.1:9",
            "--access-token",
            "t",
            "set",
            "VIN",
            "charge_limit",
            "lots",
        ])
        .assert()
        .code(2);
}

// ── Catalog ─────────────────────────────────────────────────────────

#[test]
fn test_catalog_lists_builtin_nodes() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["catalog", "commands", "--output", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flash_lights").and(predicate::str::contains("wake_up")));

    matebridge_cmd(home.path())
        .args(["catalog", "settings", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"percent\""));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success();
}

#[test]
fn test_config_set_creates_profile() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["config", "set", "server_url", "http://teslamate:4000"])
        .assert()
        .success();
    matebridge_cmd(home.path())
        .args(["config", "set", "access_token", "hunter2"])
        .assert()
        .success();

    matebridge_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));

    matebridge_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("http://teslamate:4000")
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_use_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["config", "use", "garage"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("garage"));
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["config", "set", "colour", "red"])
        .assert()
        .code(2);
}

// ── Against a mocked API ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_reports_connected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "pong" })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["--server-url", &server.uri(), "--access-token", "test-token"])
        .args(["--color", "never", "ping"])
        .assert()
        .success()
        .stdout(predicate::str::contains("connected"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_unauthorized_exits_with_auth_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["--server-url", &server.uri(), "--access-token", "wrong", "ping"])
        .assert()
        .code(3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_lists_vehicles() {
    let server = MockServer::start().await;
    mount_fleet(&server).await;

    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["--server-url", &server.uri(), "--access-token", "test-token"])
        .args(["status", "--output", "json"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("5YJ3E7EAXKF000001")
                .and(predicate::str::contains("\"online\"")),
        );

    matebridge_cmd(home.path())
        .args(["--server-url", &server.uri(), "--access-token", "test-token"])
        .args(["status", "--tree", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cars.5YJ3E7EAXKF000001.status.battery_details.battery_level=71",
        ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_set_sends_setting_command() {
    let server = MockServer::start().await;
    mount_fleet(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/cars/1/command/set_charge_limit"))
        .and(body_json(json!({ "percent": 80 })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "response": { "result": true } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["--server-url", &server.uri(), "--access-token", "test-token"])
        .args(["set", "5YJ3E7EAXKF000001", "charge_limit", "80"])
        .assert()
        .success()
        .stdout(predicate::str::contains("charge_limit on 5YJ3E7EAXKF000001 = 80"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_command_for_unknown_vehicle() {
    let server = MockServer::start().await;
    mount_fleet(&server).await;

    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["--server-url", &server.uri(), "--access-token", "test-token"])
        .args(["command", "NOPE", "flash_lights"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("NOPE"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ping_uses_profile_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ping"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "pong" })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    matebridge_cmd(home.path())
        .args(["config", "set", "server_url", &server.uri()])
        .assert()
        .success();
    matebridge_cmd(home.path())
        .args(["config", "set", "access_token", "stored-token"])
        .assert()
        .success();

    matebridge_cmd(home.path())
        .args(["--color", "never", "ping"])
        .assert()
        .success()
        .stdout(predicate::str::contains("connected"));
}
