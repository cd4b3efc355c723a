//! CLI integration tests.

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use chrono::{Duration, Utc};
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn cloudlink() -> Command {
    let mut cmd = cargo_bin_cmd!("cloudlink");
    cmd.env_remove("CLOUDLINK_UPSTREAM_PROTOCOL")
        .env_remove("https_proxy")
        .env_remove("HTTPS_PROXY");
    cmd
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

fn token_valid_for_mins(mins: i64) -> String {
    let se = (Utc::now() + Duration::minutes(mins)).timestamp();
    format!("SharedAccessSignature sr=hub.example.net&sig=abc&se={se}")
}

const VALID: &str = r#"
[gateway]
device_id = "edge-1"
hostname = "hub.example.net"

[upstream]
protocol = "mqtt"
proxy = "http://proxy.local:3128"
"#;

#[test]
fn test_help_lists_commands() {
    cloudlink()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("token"));
}

#[test]
fn test_version() {
    cloudlink()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cloudlink"));
}

#[test]
fn test_check_valid_config() {
    let file = write_config(VALID);

    cloudlink()
        .args(["--color", "never", "check", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"))
        .stdout(predicate::str::contains("edge-1/$edgeHub"))
        .stdout(predicate::str::contains("mqtt"))
        .stdout(predicate::str::contains("Proxy configured but ignored"));
}

#[test]
fn test_check_json_output() {
    let file = write_config(VALID);

    cloudlink()
        .args(["check", "--json", "--config"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"section""#))
        .stdout(predicate::str::contains(r#""label":"Protocol""#));
}

#[test]
fn test_check_invalid_config_fails() {
    let file = write_config("[gateway]\ndevice_id = \"edge-1\"\n");

    cloudlink()
        .args(["check", "--config"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("hostname"));
}

#[test]
fn test_check_missing_file_fails() {
    cloudlink()
        .args(["check", "--config", "/nonexistent/cloudlink.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}

#[test]
fn test_token_usable() {
    cloudlink()
        .args(["--color", "never", "token"])
        .arg(token_valid_for_mins(60))
        .assert()
        .success()
        .stdout(predicate::str::contains("Token is usable"));
}

#[test]
fn test_token_inside_buffer_exits_two() {
    cloudlink()
        .args(["--color", "never", "token"])
        .arg(token_valid_for_mins(2))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("expiry buffer"));
}

#[test]
fn test_token_custom_buffer() {
    cloudlink()
        .args(["token", "--buffer-secs", "60"])
        .arg(token_valid_for_mins(2))
        .assert()
        .success();
}

#[test]
fn test_token_expired_exits_two() {
    cloudlink()
        .args(["--color", "never", "token"])
        .arg(token_valid_for_mins(-5))
        .assert()
        .code(2)
        .stdout(predicate::str::contains("expired"));
}

#[test]
fn test_token_without_expiry_fails() {
    cloudlink()
        .args(["token", "SharedAccessSignature sr=x&sig=y"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expiry"));
}
