//! Configuration loading from a real file with environment and CLI layers

use parlor::cli::Cli;
use parlor::config::{Config, UnansweredPolicy};
use serial_test::serial;

mod common;
use common::temp_config_file;

const ENV_VARS: &[&str] = &[
    "PARLOR_BACKEND_URL",
    "PARLOR_TIMEOUT_SECONDS",
    "PARLOR_USERNAME",
    "PARLOR_DEFAULT_MODEL",
    "PARLOR_TRANSCRIPT_PATH",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_load_full_file() {
    clear_env();
    let (_dir, path) = temp_config_file(
        r#"
backend:
  base_url: "https://chat.example.com/api"
  timeout_seconds: 45
auth:
  username: ada
chat:
  default_model: gpt-4o
  title_prefix_chars: 20
  on_send_failure: rollback
  confirm_delete: false
  transcript_path: /tmp/parlor-live.html
models:
  - gpt-4o
  - llama3
"#,
    );

    let config = Config::load(path.to_str().unwrap(), &Cli::default()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.backend.base_url, "https://chat.example.com/api");
    assert_eq!(config.backend.timeout_seconds, 45);
    assert_eq!(config.auth.username.as_deref(), Some("ada"));
    assert_eq!(config.chat.default_model, "gpt-4o");
    assert_eq!(config.chat.title_prefix_chars, 20);
    assert_eq!(config.chat.on_send_failure, UnansweredPolicy::Rollback);
    assert!(!config.chat.confirm_delete);
    assert_eq!(config.models, vec!["gpt-4o", "llama3"]);
}

#[test]
#[serial]
fn test_env_then_cli_override_file() {
    clear_env();
    let (_dir, path) = temp_config_file("backend:\n  base_url: http://file:5000\n");
    std::env::set_var("PARLOR_BACKEND_URL", "http://env:5000");
    std::env::set_var("PARLOR_DEFAULT_MODEL", "env-model");

    let cli = Cli {
        backend_url: Some("http://cli:5000".to_string()),
        ..Cli::default()
    };
    let config = Config::load(path.to_str().unwrap(), &cli).unwrap();
    clear_env();

    assert_eq!(config.backend.base_url, "http://cli:5000");
    assert_eq!(config.chat.default_model, "env-model");
}

#[test]
#[serial]
fn test_invalid_yaml_is_config_error() {
    clear_env();
    let (_dir, path) = temp_config_file("backend: [not, a, map\n");

    let err = Config::load(path.to_str().unwrap(), &Cli::default()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
#[serial]
fn test_file_with_bad_values_fails_validation() {
    clear_env();
    let (_dir, path) = temp_config_file("backend:\n  base_url: ftp://example.com\n");

    let config = Config::load(path.to_str().unwrap(), &Cli::default()).unwrap();
    assert!(config.validate().is_err());
}
