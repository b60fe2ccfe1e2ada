//! Tests for config module

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use fleet_availability::config::Config;
use serial_test::serial;

const ENV_KEYS: &[&str] = &[
    "FLEET_BIND_ADDRESS",
    "VEHICLE_SERVICE_URL",
    "FLEET_REGISTRY_TIMEOUT_MS",
    "FLEET_REGISTRY_CONNECT_TIMEOUT_MS",
    "FLEET_SQLITE_PATH",
    "FLEET_LOG_LEVEL",
    "FLEET_LOG_FORMAT",
    "FLEET_ENABLE_CORS",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
fn test_config_file_exists() {
    assert!(
        Path::new("config.toml").exists(),
        "config.toml should exist in project root"
    );
}

#[test]
fn test_shipped_config_loads() {
    let config = Config::from_file(Path::new("config.toml")).expect("config.toml should load");

    assert_eq!(config.server.bind_address.port(), 8001);
    assert_eq!(config.registry.url, "http://127.0.0.1:8000/graphql");
    assert_eq!(config.registry.timeout(), Duration::from_secs(5));
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_zero_timeout_file_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[registry]
url = "http://registry:8000/graphql"
timeout_ms = 0
connect_timeout_ms = 100
"#
    )
    .unwrap();

    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn test_missing_file_is_error() {
    assert!(Config::from_file(Path::new("does/not/exist.toml")).is_err());
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();

    let config = Config::from_env().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("VEHICLE_SERVICE_URL", "https://vehicles.internal/graphql");
    std::env::set_var("FLEET_REGISTRY_TIMEOUT_MS", "750");
    std::env::set_var("FLEET_BIND_ADDRESS", "127.0.0.1:9100");
    std::env::set_var("FLEET_LOG_FORMAT", "json");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.registry.url, "https://vehicles.internal/graphql");
    assert_eq!(config.registry.timeout(), Duration::from_millis(750));
    assert_eq!(config.server.bind_address.port(), 9100);
    assert_eq!(config.logging.format, "json");
}

#[test]
#[serial]
fn test_from_env_rejects_zero_timeout() {
    clear_env();
    std::env::set_var("FLEET_REGISTRY_TIMEOUT_MS", "0");

    let result = Config::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_from_env_rejects_unparsable_values() {
    for (key, value) in [
        ("FLEET_REGISTRY_TIMEOUT_MS", "abc"),
        ("FLEET_REGISTRY_CONNECT_TIMEOUT_MS", "-5"),
        ("FLEET_ENABLE_CORS", "yes"),
        ("FLEET_BIND_ADDRESS", "localhost"),
    ] {
        clear_env();
        std::env::set_var(key, value);

        let result = Config::from_env();
        clear_env();

        let err = result.expect_err(key);
        assert!(err.to_string().contains(key), "error should name {key}: {err}");
    }
}
