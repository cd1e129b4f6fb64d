//! Optional on-disk configuration and log-directory resolution.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const LOG_DIR_ENV: &str = "WRITEGUARD_LOG_DIR";

/// Contents of `writeguard/config.json`. Every field is optional in the
/// file; missing fields take the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_dir: Option<PathBuf>,
    pub show_removable: bool,
}

pub fn load() -> AppConfig {
    load_from(&config_file_path())
}

fn load_from(path: &Path) -> AppConfig {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return AppConfig::default(),
    };
    match serde_json::from_str(&raw) {
        Ok(config) => config,
        Err(error) => {
            // Logging is not up yet when the config is read, so report on
            // stderr and carry on with defaults.
            eprintln!("Ignoring malformed config {:?}: {}", path, error);
            AppConfig::default()
        }
    }
}

fn config_file_path() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("writeguard")
        .join("config.json")
}

/// Picks the log directory: command-line flag, then the `WRITEGUARD_LOG_DIR`
/// environment variable, then the config file, then the platform default.
pub fn resolve_log_dir(cli_override: Option<&Path>, config: &AppConfig) -> PathBuf {
    if let Some(dir) = cli_override {
        return dir.to_path_buf();
    }
    if let Ok(custom) = std::env::var(LOG_DIR_ENV) {
        if !custom.trim().is_empty() {
            return PathBuf::from(custom);
        }
    }
    if let Some(dir) = &config.log_dir {
        return dir.clone();
    }
    default_log_dir()
}

fn default_log_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("writeguard")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        fs,
        sync::atomic::{AtomicU64, Ordering},
    };

    fn temp_config_file(contents: &str) -> PathBuf {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let dir = std::env::temp_dir().join(format!(
            "writeguard-config-test-{}-{}",
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::Relaxed)
        ));
        fs::create_dir_all(&dir).expect("create temp config dir");
        let path = dir.join("config.json");
        fs::write(&path, contents).expect("write temp config");
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_from(Path::new("/nonexistent/writeguard/config.json"));
        assert!(config.log_dir.is_none());
        assert!(!config.show_removable);
    }

    #[test]
    fn empty_object_yields_defaults() {
        let path = temp_config_file("{}");
        let config = load_from(&path);
        assert!(config.log_dir.is_none());
        assert!(!config.show_removable);
        cleanup(&path);
    }

    #[test]
    fn populated_file_is_honoured() {
        let path = temp_config_file(r#"{ "log_dir": "/var/log/wg", "show_removable": true }"#);
        let config = load_from(&path);
        assert_eq!(config.log_dir.as_deref(), Some(Path::new("/var/log/wg")));
        assert!(config.show_removable);
        cleanup(&path);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_config_file("{ not json at all");
        let config = load_from(&path);
        assert!(config.log_dir.is_none());
        assert!(!config.show_removable);
        cleanup(&path);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let path = temp_config_file(r#"{ "show_removable": true, "future_option": 3 }"#);
        let config = load_from(&path);
        assert!(config.show_removable);
        cleanup(&path);
    }

    #[test]
    fn cli_flag_outranks_everything() {
        let config = AppConfig {
            log_dir: Some(PathBuf::from("/from/config")),
            show_removable: false,
        };
        let resolved = resolve_log_dir(Some(Path::new("/from/cli")), &config);
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn log_dir_precedence_walks_env_then_file_then_default() {
        // Single test mutates the environment variable so parallel test
        // threads never observe a half-set value.
        let config = AppConfig {
            log_dir: Some(PathBuf::from("/from/config")),
            show_removable: false,
        };

        std::env::set_var(LOG_DIR_ENV, "/from/env");
        assert_eq!(
            resolve_log_dir(None, &config),
            PathBuf::from("/from/env") // env outranks the config file
        );
        assert_eq!(
            resolve_log_dir(Some(Path::new("/from/cli")), &config),
            PathBuf::from("/from/cli") // flag outranks env
        );

        std::env::remove_var(LOG_DIR_ENV);
        assert_eq!(resolve_log_dir(None, &config), PathBuf::from("/from/config"));
        assert_eq!(
            resolve_log_dir(None, &AppConfig::default()),
            default_log_dir()
        );
    }
}
