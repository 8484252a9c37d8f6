use fetchq::Locale;
use fetchq::config::{Config, DEFAULT_RETRY_BOUND};
use secrecy::ExposeSecret;
use std::time::Duration;

const VARS: [&str; 5] = [
    "FETCHQ_RETRY_BOUND",
    "FETCHQ_REQUEST_TIMEOUT_MS",
    "FETCHQ_AUTH_TOKEN",
    "FETCHQ_LOCALE",
    "LOG_LEVEL",
];

fn clear_vars() {
    for var in VARS {
        unsafe {
            std::env::remove_var(var);
        }
    }
}

// Env vars are process-global, so every env scenario runs in one test.
#[test]
fn config_from_env() {
    clear_vars();

    // Defaults when nothing is set
    let config = Config::from_env().unwrap();
    assert_eq!(config.retry_bound, DEFAULT_RETRY_BOUND);
    assert!(config.auth_token.is_none());
    assert!(!config.log_level.is_empty());

    // Explicit values
    unsafe {
        std::env::set_var("FETCHQ_RETRY_BOUND", "3");
        std::env::set_var("FETCHQ_REQUEST_TIMEOUT_MS", "250");
        std::env::set_var("FETCHQ_AUTH_TOKEN", "sk-test-key");
        std::env::set_var("FETCHQ_LOCALE", "es");
        std::env::set_var("LOG_LEVEL", "debug");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.retry_bound, 3);
    assert_eq!(config.request_timeout, Some(Duration::from_millis(250)));
    assert_eq!(
        config.auth_token.as_ref().map(|t| t.expose_secret().to_string()),
        Some("sk-test-key".to_string())
    );
    assert_eq!(config.locale, Locale::Es);
    assert_eq!(config.log_level, "debug");

    // Token never shows up in debug output
    assert!(!format!("{config:?}").contains("sk-test-key"));

    // Malformed and out-of-range values fail fast
    unsafe {
        std::env::set_var("FETCHQ_RETRY_BOUND", "many");
    }
    assert!(Config::from_env().is_err());
    unsafe {
        std::env::set_var("FETCHQ_RETRY_BOUND", "0");
    }
    assert!(Config::from_env().is_err());

    clear_vars();
}

#[test]
fn config_load_reads_toml_file() {
    let path = std::env::temp_dir().join(format!("fetchq-config-{}.toml", std::process::id()));
    std::fs::write(&path, "[queue]\nretry_bound = 7\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.retry_bound, 7);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn config_load_fails_for_missing_file() {
    let path = std::env::temp_dir().join("fetchq-definitely-missing.toml");
    assert!(Config::load(&path).is_err());
}
