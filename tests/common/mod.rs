use chrono::{TimeZone, Utc};
use parlor::chat::Chat;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("parlor.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// A chat created `secs` seconds after the epoch
#[allow(dead_code)]
pub fn chat_at(id: &str, model: &str, secs: i64) -> Chat {
    Chat::new(
        id,
        model,
        Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
    )
}
