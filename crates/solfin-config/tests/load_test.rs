#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use solfin_config::{Config, SessionBackend, load_config_from, save_config_to};
use solfin_core::{Position, SessionStorage};

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(cfg, Config::default());
}

#[test]
fn file_overrides_defaults_per_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[api]
base_url = "https://api.solfin.example/v1"
refresh_timeout_secs = 5

[notifications]
error_ms = 8000
position = "bottom-center"

[session]
backend = "memory"
"#,
    )
    .unwrap();

    let cfg = load_config_from(&path).unwrap();
    assert_eq!(cfg.api.timeout_secs, 30);
    assert_eq!(cfg.session.backend, SessionBackend::Memory);

    let client = cfg.to_client_config().unwrap();
    assert_eq!(client.base_url.as_str(), "https://api.solfin.example/v1");
    assert_eq!(client.refresh_timeout, Duration::from_secs(5));
    assert_eq!(client.notifications.error_duration, Duration::from_millis(8000));
    assert_eq!(client.notifications.success_duration, Duration::from_millis(3000));
    assert_eq!(client.notifications.default_position, Position::BottomCenter);
}

#[test]
fn unknown_position_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[notifications]\nposition = \"middle\"\n").unwrap();
    assert!(load_config_from(&path).is_err());
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let mut cfg = Config::default();
    cfg.api.user_agent = Some("solfin-test".into());
    cfg.notifications.max_visible = 3;
    cfg.session.path = Some(dir.path().join("session.json"));

    save_config_to(&cfg, &path).unwrap();
    assert_eq!(load_config_from(&path).unwrap(), cfg);
}

#[test]
fn file_backend_uses_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::default();
    cfg.session.path = Some(dir.path().join("session.json"));

    let storage = cfg.session_storage().unwrap();
    assert!(storage.load().unwrap().is_none());
}
