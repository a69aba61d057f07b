//! Configuration loader
//!
//! Loads [`MirrorConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `PROCMIRROR_REFRESH_THREADS` is unset, falls back to a config file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. With no environment and no file, uses [`MirrorConfig::default`]
//!
//! ## Environment Variables
//! - `PROCMIRROR_REFRESH_THREADS`: Bulk refresh worker threads, `0` for one
//!   per CPU (required to select the environment source)
//! - `PROCMIRROR_PRESERVE_STATES`: Comma-separated lifecycle states that keep
//!   cache entries across an area change (e.g. `in_area,paused`)
//! - `PROCMIRROR_LOG_LEVEL`: Default log filter when `RUST_LOG` is unset
//! - `PROCMIRROR_LOG_JSON`: Emit JSON log lines (true/false)
//! - `PROCMIRROR_RANKED_PATH`: File holding the saved ranked container
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./procmirror.json` or `./procmirror.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use procmirror_domain::{
    CacheSettings, LifecycleState, LoggingConfig, MirrorConfig, MirrorError, PersistenceConfig,
    Result,
};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["config.json", "config.toml", "procmirror.json", "procmirror.toml"];

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If that fails, loads
/// the first config file found by [`probe_config_paths`], and with no file
/// present returns the defaults.
///
/// # Errors
/// Returns `MirrorError::Config` if a config file was found but cannot be
/// read or parsed.
pub fn load() -> Result<MirrorConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            return Ok(config);
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
        }
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No configuration source found, using defaults");
            Ok(MirrorConfig::default())
        }
    }
}

/// Load configuration from environment variables
///
/// `PROCMIRROR_REFRESH_THREADS` must be present; every other variable falls
/// back to its default when unset.
///
/// # Environment Variables
/// See module documentation for the complete list.
///
/// # Errors
/// Returns `MirrorError::Config` if the required variable is missing or any
/// variable has an invalid value.
pub fn load_from_env() -> Result<MirrorConfig> {
    let refresh_threads = env_var("PROCMIRROR_REFRESH_THREADS").and_then(|s| {
        s.trim()
            .parse::<usize>()
            .map_err(|e| MirrorError::Config(format!("Invalid refresh thread count: {}", e)))
    })?;

    let preserve_states = match std::env::var("PROCMIRROR_PRESERVE_STATES") {
        Ok(list) => parse_states(&list)?,
        Err(_) => CacheSettings::default().preserve_states,
    };

    let defaults = LoggingConfig::default();
    let level = std::env::var("PROCMIRROR_LOG_LEVEL").unwrap_or(defaults.level);
    let json = env_bool("PROCMIRROR_LOG_JSON", defaults.json);

    let ranked_path = std::env::var_os("PROCMIRROR_RANKED_PATH").map(PathBuf::from);

    Ok(MirrorConfig {
        cache: CacheSettings { refresh_threads, preserve_states },
        logging: LoggingConfig { level, json },
        persistence: PersistenceConfig { ranked_path },
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
/// Sections and fields missing from the file take their defaults.
///
/// # Errors
/// Returns `MirrorError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<MirrorConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(MirrorError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            MirrorError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| MirrorError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `MirrorError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<MirrorConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| MirrorError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| MirrorError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(MirrorError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its two parents, and the
/// executable's directory and its two parents. Only the working directory
/// and executable directory are checked for `procmirror.{json,toml}`.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = CONFIG_FILE_NAMES.iter().map(|name| dir.join(name)).collect();
    for up in ["..", "../.."] {
        candidates.push(dir.join(up).join("config.json"));
        candidates.push(dir.join(up).join("config.toml"));
    }
    candidates
}

/// Parse a comma-separated list of lifecycle state names.
///
/// An empty or all-whitespace list preserves nothing.
fn parse_states(list: &str) -> Result<Vec<LifecycleState>> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            LifecycleState::parse(name)
                .ok_or_else(|| MirrorError::Config(format!("Unknown lifecycle state: {}", name)))
        })
        .collect()
}

/// Get required environment variable
///
/// # Errors
/// Returns `MirrorError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        MirrorError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ENV_KEYS: [&str; 5] = [
        "PROCMIRROR_REFRESH_THREADS",
        "PROCMIRROR_PRESERVE_STATES",
        "PROCMIRROR_LOG_LEVEL",
        "PROCMIRROR_LOG_JSON",
        "PROCMIRROR_RANKED_PATH",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    fn temp_config(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        for (key, value) in [
            ("TEST_PM_BOOL_1", "1"),
            ("TEST_PM_BOOL_TRUE", "true"),
            ("TEST_PM_BOOL_YES", "yes"),
            ("TEST_PM_BOOL_ON", "ON"),
        ] {
            std::env::set_var(key, value);
            assert!(env_bool(key, false), "{key}={value}");
            std::env::remove_var(key);
        }

        for (key, value) in [("TEST_PM_BOOL_0", "0"), ("TEST_PM_BOOL_OFF", "off")] {
            std::env::set_var(key, value);
            assert!(!env_bool(key, true), "{key}={value}");
            std::env::remove_var(key);
        }

        std::env::remove_var("TEST_PM_BOOL_MISSING");
        assert!(env_bool("TEST_PM_BOOL_MISSING", true));
        assert!(!env_bool("TEST_PM_BOOL_MISSING", false));
    }

    #[test]
    fn test_load_from_env_all_vars_set() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("PROCMIRROR_REFRESH_THREADS", "6");
        std::env::set_var("PROCMIRROR_PRESERVE_STATES", "in_area, menu");
        std::env::set_var("PROCMIRROR_LOG_LEVEL", "debug");
        std::env::set_var("PROCMIRROR_LOG_JSON", "true");
        std::env::set_var("PROCMIRROR_RANKED_PATH", "/tmp/ranked.json");

        let result = load_from_env();
        clear_env();
        assert!(result.is_ok(), "Should load config from env vars, error: {:?}", result.err());

        let config = result.unwrap();
        assert_eq!(config.cache.refresh_threads, 6);
        assert_eq!(config.cache.preserve_states, vec![LifecycleState::InArea, LifecycleState::Menu]);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.persistence.ranked_path, Some(PathBuf::from("/tmp/ranked.json")));
    }

    #[test]
    fn test_load_from_env_optional_vars_default() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        std::env::set_var("PROCMIRROR_REFRESH_THREADS", "0");

        let result = load_from_env();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config, MirrorConfig::default());
    }

    #[test]
    fn test_load_from_env_missing_var() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        let err = load_from_env().unwrap_err();
        assert!(matches!(err, MirrorError::Config(_)), "Should be a Config error");
    }

    #[test]
    fn test_load_from_env_invalid_values() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("PROCMIRROR_REFRESH_THREADS", "many");
        assert!(matches!(load_from_env(), Err(MirrorError::Config(_))));

        std::env::set_var("PROCMIRROR_REFRESH_THREADS", "2");
        std::env::set_var("PROCMIRROR_PRESERVE_STATES", "in_area,underwater");
        let err = load_from_env().unwrap_err();
        clear_env();
        assert!(err.to_string().contains("underwater"));
    }

    #[test]
    fn test_empty_preserve_list_preserves_nothing() {
        assert!(parse_states(" , ").unwrap().is_empty());
        assert_eq!(parse_states("PAUSED").unwrap(), vec![LifecycleState::Paused]);
    }

    #[test]
    fn test_load_from_file_json() {
        let path = temp_config(
            r#"{
                "cache": { "refresh_threads": 3, "preserve_states": ["paused"] },
                "logging": { "level": "warn", "json": true }
            }"#,
            "json",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();
        assert!(result.is_ok(), "Should load config from JSON file");

        let config = result.unwrap();
        assert_eq!(config.cache.refresh_threads, 3);
        assert_eq!(config.cache.preserve_states, vec![LifecycleState::Paused]);
        assert_eq!(config.logging.level, "warn");
        assert!(config.persistence.ranked_path.is_none());
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = temp_config(
            r#"
[cache]
refresh_threads = 8

[persistence]
ranked_path = "ranked.json"
"#,
            "toml",
        );

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();
        assert!(result.is_ok(), "Should load config from TOML file");

        let config = result.unwrap();
        assert_eq!(config.cache.refresh_threads, 8);
        assert_eq!(config.cache.preserve_states, CacheSettings::default().preserve_states);
        assert_eq!(config.persistence.ranked_path, Some(PathBuf::from("ranked.json")));
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/config.json")));
        assert!(matches!(result, Err(MirrorError::Config(_))), "Should be a Config error");
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let path = temp_config(r#"{ "cache": { "refresh_threads": "#, "json");

        let result = load_from_file(Some(path.clone()));
        std::fs::remove_file(path).ok();
        assert!(result.is_err(), "Should fail with invalid JSON");
    }

    #[test]
    fn test_parse_config_unknown_state_rejected() {
        let result = parse_config(
            r#"{ "cache": { "preserve_states": ["sleeping"] } }"#,
            &PathBuf::from("test.json"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", &PathBuf::from("test.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_candidates_cover_names_and_parents() {
        let candidates = candidates_in(Path::new("/opt/app"));
        assert_eq!(candidates.len(), 8);
        assert_eq!(candidates[0], PathBuf::from("/opt/app/config.json"));
        assert_eq!(candidates[3], PathBuf::from("/opt/app/procmirror.toml"));
        assert_eq!(candidates[7], PathBuf::from("/opt/app/../../config.toml"));
    }
}
