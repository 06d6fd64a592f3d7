//! `ServeConfig` loading tests: defaults, overrides, unknown field rejection
//! and semantic validation of loaded files.

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tern_common::config::{ConfigError, ConfigLoader, LogLevel, ServeConfig};
use tern_common::consts::{DEFAULT_TIMEOUT_MS, MAX_TRIGGER_SLOTS};

fn write_serve_toml(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("serve.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn minimal_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_serve_toml(
        dir.path(),
        r#"
segment = "sensors"

[shared]
service_name = "serve-01"
"#,
    );

    let config = ServeConfig::load(&path).unwrap();
    assert_eq!(config.segment, "sensors");
    assert_eq!(config.slots, 1);
    assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    assert_eq!(config.max_events, None);
    assert_eq!(config.shared.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn full_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_serve_toml(
        dir.path(),
        r#"
segment = "lidar"
slots = 8
timeout_ms = 20
max_events = 3

[shared]
log_level = "trace"
service_name = "serve-02"
"#,
    );

    let config = ServeConfig::load(&path).unwrap();
    assert_eq!(config.slots, 8);
    assert_eq!(config.timeout_ms, 20);
    assert_eq!(config.max_events, Some(3));
    assert_eq!(config.shared.log_level, LogLevel::Trace);
}

#[test]
fn unknown_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_serve_toml(
        dir.path(),
        r#"
segment = "sensors"
capacity = 12

[shared]
service_name = "serve-01"
"#,
    );

    assert!(matches!(
        ServeConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn missing_segment_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_serve_toml(
        dir.path(),
        r#"
[shared]
service_name = "serve-01"
"#,
    );

    assert!(matches!(
        ServeConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn too_many_slots_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = write_serve_toml(
        dir.path(),
        &format!(
            r#"
segment = "sensors"
slots = {}

[shared]
service_name = "serve-01"
"#,
            MAX_TRIGGER_SLOTS + 1
        ),
    );

    let config = ServeConfig::load(&path).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(_))
    ));
}
