//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! turning it into runtime objects.

use std::io::Write;

use procmirror_common::lifecycle::RetentionPolicy;
use procmirror_domain::{LifecycleEvent, LifecycleState, MirrorError};
use procmirror_infra::config;
use tempfile::NamedTempFile;

fn write_config(contents: &str, extension: &str) -> std::path::PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");
    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_config(
        r#"{
            "cache": {
                "refresh_threads": 2,
                "preserve_states": ["in_area", "menu"]
            },
            "logging": { "level": "trace", "json": true },
            "persistence": { "ranked_path": "/var/lib/procmirror/ranked.json" }
        }"#,
        "json",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();
    assert!(result.is_ok(), "Failed to load config from JSON file");

    let config = result.unwrap();
    assert_eq!(config.cache.refresh_threads, 2);
    assert_eq!(config.logging.level, "trace");
    assert!(config.logging.json);
    assert_eq!(
        config.persistence.ranked_path.as_deref(),
        Some(std::path::Path::new("/var/lib/procmirror/ranked.json"))
    );

    // The loaded states drive retention
    let policy = RetentionPolicy::from_settings(&config.cache);
    assert!(!policy.should_clear(LifecycleEvent::LogicalAreaChanged, LifecycleState::Menu));
    assert!(policy.should_clear(LifecycleEvent::LogicalAreaChanged, LifecycleState::Paused));
}

#[test]
fn test_load_config_from_toml_file() {
    let path = write_config(
        r#"
[cache]
refresh_threads = 1
preserve_states = []

[logging]
level = "warn"
"#,
        "toml",
    );

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();

    let config = result.expect("Failed to load config from TOML file");
    assert_eq!(config.cache.refresh_threads, 1);
    assert!(config.cache.preserve_states.is_empty());
    assert_eq!(config.logging.level, "warn");
    assert!(!config.logging.json);
}

#[test]
fn test_load_config_rejects_wrong_types() {
    let path = write_config(r#"{ "cache": { "refresh_threads": "four" } }"#, "json");

    let result = config::load_from_file(Some(path.clone()));
    std::fs::remove_file(path).ok();

    assert!(matches!(result, Err(MirrorError::Config(_))));
}
