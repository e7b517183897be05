// tests/config_env.rs
use std::io::Write;

use masa_source::config::{ConnectorConfig, DEFAULT_BASE_URL, ENV_API_KEY, ENV_BASE_URL, ENV_TIMEOUT_SECS};
use serial_test::serial;
use tempfile::Builder;

fn clear_env() {
    for k in [ENV_API_KEY, ENV_BASE_URL, ENV_TIMEOUT_SECS] {
        std::env::remove_var(k);
    }
}

fn temp_file(ext: &str, body: &str) -> tempfile::NamedTempFile {
    let mut f = Builder::new().suffix(ext).tempfile().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f
}

#[test]
#[serial]
fn from_env_reads_all_variables() {
    clear_env();
    std::env::set_var(ENV_API_KEY, "k-123");
    std::env::set_var(ENV_BASE_URL, "http://localhost:8080/api/");
    std::env::set_var(ENV_TIMEOUT_SECS, "12");

    let cfg = ConnectorConfig::from_env().unwrap();
    assert_eq!(cfg.api_key, "k-123");
    assert_eq!(cfg.base_url(), "http://localhost:8080/api");
    assert_eq!(cfg.timeout_secs, 12);
    assert!(cfg.validate().is_ok());
    clear_env();
}

#[test]
#[serial]
fn from_env_without_key_fails_validation_only() {
    clear_env();
    let cfg = ConnectorConfig::from_env().unwrap();
    assert_eq!(cfg.base_url(), DEFAULT_BASE_URL);
    assert!(cfg.validate().is_err());
}

#[test]
#[serial]
fn bad_timeout_is_reported() {
    clear_env();
    std::env::set_var(ENV_TIMEOUT_SECS, "soon");
    let err = ConnectorConfig::from_env().unwrap_err();
    assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    clear_env();
}

#[test]
#[serial]
fn toml_file_with_env_key() {
    clear_env();
    std::env::set_var(ENV_API_KEY, "from-env");
    let f = temp_file(
        ".toml",
        r#"
apiKey = "ENV"
baseUrl = "https://masa.example/api"
timeoutSecs = 9
"#,
    );

    let cfg = ConnectorConfig::load_from_file(f.path()).unwrap();
    assert_eq!(cfg.api_key, "from-env");
    assert_eq!(cfg.base_url(), "https://masa.example/api");
    assert_eq!(cfg.timeout_secs, 9);
    assert_eq!(cfg.connect_timeout_secs, 5);
    clear_env();
}

#[test]
#[serial]
fn env_key_without_variable_is_an_error() {
    clear_env();
    let f = temp_file(".json", r#"{"apiKey": "ENV"}"#);
    let err = ConnectorConfig::load_from_file(f.path()).unwrap_err();
    assert!(err.to_string().contains(ENV_API_KEY));
}

#[test]
#[serial]
fn json_file_with_literal_key() {
    clear_env();
    let f = temp_file(".json", r#"{"apiKey": "literal", "userAgent": "probe/1"}"#);
    let cfg = ConnectorConfig::load_from_file(f.path()).unwrap();
    assert_eq!(cfg.api_key, "literal");
    assert_eq!(cfg.user_agent, "probe/1");
    assert_eq!(cfg.timeout_secs, 30);
}
