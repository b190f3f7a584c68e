use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect::<HashMap<_, _>>();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_apply_when_environment_is_empty() {
    let config = ClientConfig::from_lookup(lookup_from(&[("HOME", "/home/alice")])).expect("config");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.ws_url, None);
    assert_eq!(config.timeout, Duration::from_millis(15_000));
    assert_eq!(config.state_dir, PathBuf::from("/home/alice/.videohub"));
    assert_eq!(config.session_file(), PathBuf::from("/home/alice/.videohub/session.json"));
}

#[test]
fn environment_overrides_every_field() {
    let config = ClientConfig::from_lookup(lookup_from(&[
        ("VIDEOHUB_API_BASE_URL", "https://api.example.com"),
        ("VIDEOHUB_WS_URL", "wss://ws.example.com/"),
        ("VIDEOHUB_TIMEOUT_MS", "2500"),
        ("VIDEOHUB_STATE_DIR", "/tmp/vh"),
    ]))
    .expect("config");
    assert_eq!(config.base_url, "https://api.example.com");
    assert_eq!(config.timeout, Duration::from_millis(2500));
    assert_eq!(config.state_dir, PathBuf::from("/tmp/vh"));
    assert_eq!(config.ws_base().expect("ws"), "wss://ws.example.com");
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let config = ClientConfig::from_lookup(lookup_from(&[("VIDEOHUB_API_BASE_URL", "  ")])).expect("config");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
}

#[test]
fn non_numeric_timeout_is_rejected() {
    let err = ClientConfig::from_lookup(lookup_from(&[("VIDEOHUB_TIMEOUT_MS", "soon")]))
        .expect_err("timeout must be numeric");
    assert!(matches!(err, ConfigError::InvalidValue { key: "VIDEOHUB_TIMEOUT_MS", .. }));
}

#[test]
fn ws_base_switches_scheme() {
    assert_eq!(ClientConfig::new("http://127.0.0.1:8080/").ws_base().expect("ws"), "ws://127.0.0.1:8080");
    assert_eq!(ClientConfig::new("https://videohub.example").ws_base().expect("ws"), "wss://videohub.example");
}

#[test]
fn ws_base_rejects_unknown_scheme() {
    let err = ClientConfig::new("ftp://host").ws_base().expect_err("scheme");
    assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
}
