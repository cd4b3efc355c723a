//! Configuration loading tests against files on disk.

use std::io::Write;

use tempfile::NamedTempFile;

use cloudlink::error::{ConfigError, Error};
use cloudlink::infrastructure::config::settings::Config;
use cloudlink::port::Protocol;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

const FULL: &str = r#"
[gateway]
device_id = "edge-7"
module_id = "$edgeHub"
hostname = "hub.example.net"

[logging]
level = "debug"
format = "json"

[upstream]
protocol = "mqtt_ws"
connection_pool_size = 8
operation_timeout_secs = 30

[token]
expiry_buffer_secs = 600
retry_delay_secs = 5

[connectivity]
connected_check_interval_secs = 60
disconnected_check_interval_secs = 15

[connection_pool]
close_on_idle_timeout = true
idle_timeout_secs = 900
idle_check_interval_secs = 30
"#;

#[test]
fn test_load_full_config() {
    let file = write_config(FULL);
    let config = Config::load(file.path()).expect("valid config");

    assert_eq!(config.gateway.identity().to_string(), "edge-7/$edgeHub");
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.upstream.connection_pool_size, 8);
    assert_eq!(config.upstream.operation_timeout().as_secs(), 30);
    assert_eq!(config.token.expiry_buffer().as_secs(), 600);
    assert_eq!(config.connectivity.connected_interval().as_secs(), 60);
    assert_eq!(config.connectivity.disconnected_interval().as_secs(), 15);
    assert_eq!(config.connection_pool.idle_timeout().as_secs(), 900);
}

#[test]
fn test_parse_toml_matches_load() {
    let file = write_config(FULL);
    let loaded = Config::load(file.path()).expect("load");
    let parsed = Config::parse_toml(FULL).expect("parse");

    assert_eq!(loaded.gateway.identity(), parsed.gateway.identity());
    assert_eq!(loaded.upstream.protocol, parsed.upstream.protocol);
}

#[test]
fn test_protocol_names_parse() {
    for (name, expected) in [
        ("amqp", Protocol::Amqp),
        ("amqp_ws", Protocol::AmqpWs),
        ("mqtt", Protocol::Mqtt),
        ("mqtt_ws", Protocol::MqttWs),
    ] {
        let toml = format!(
            "[gateway]\ndevice_id = \"d\"\nhostname = \"h\"\n[upstream]\nprotocol = \"{name}\"\n"
        );
        let mut config: Config = toml::from_str(&toml).expect("parse");
        config.apply_env_overrides(|_| None).expect("no overrides");
        assert_eq!(config.upstream.protocol, expected);
    }
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = Config::load(dir.path().join("absent.toml"));

    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let file = write_config("[gateway\ndevice_id = ");
    let result = Config::load(file.path());

    assert!(matches!(result, Err(Error::Config(ConfigError::Parse(_)))));
}

#[test]
fn test_missing_hostname_rejected() {
    let file = write_config("[gateway]\ndevice_id = \"edge-1\"\n");
    let result = Config::load(file.path());

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::MissingField { field: "hostname" }))
    ));
}

#[test]
fn test_zero_probe_interval_rejected() {
    let toml = "[gateway]\ndevice_id = \"d\"\nhostname = \"h\"\n\
                [connectivity]\ndisconnected_check_interval_secs = 0\n";
    let file = write_config(toml);

    assert!(matches!(
        Config::load(file.path()),
        Err(Error::Config(ConfigError::InvalidValue {
            field: "disconnected_check_interval_secs",
            ..
        }))
    ));
}
