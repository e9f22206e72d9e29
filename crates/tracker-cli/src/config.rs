//! CLI configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracker_core::{DEFAULT_QUERY_LIMIT, normalize_project_path};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_limit")]
    pub default_limit: i64,
}

fn default_db_path() -> PathBuf {
    tracker_core::default_db_path()
}

fn default_limit() -> i64 {
    DEFAULT_QUERY_LIMIT
}

/// Location of the optional user config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("agent-tracker").join("config.toml"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_limit: default_limit(),
        }
    }
}

impl Config {
    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.expand_paths();
        Ok(config)
    }

    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parse config {}", path.display()))
    }

    /// Load config from the default location or fall back to defaults.
    pub fn load() -> Result<Self> {
        if let Some(path) = default_config_path().filter(|p| p.exists()) {
            tracing::debug!(target: "tracker::config", "Loading config from {}", path.display());
            return Self::load_from(&path);
        }
        Ok(Config::default())
    }

    /// Point the store at a different database file. A blank path keeps
    /// the store at its default location.
    pub fn set_db_path(&mut self, raw: &str) {
        let normalized = normalize_project_path(raw);
        if normalized.is_empty() {
            tracing::warn!(
                target: "tracker::config",
                "Empty database path, using {}",
                default_db_path().display()
            );
            self.db_path = default_db_path();
        } else {
            self.db_path = PathBuf::from(normalized);
        }
    }

    fn expand_paths(&mut self) {
        let raw = self.db_path.to_string_lossy().into_owned();
        self.set_db_path(&raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.default_limit, DEFAULT_QUERY_LIMIT);
        assert!(config.db_path.ends_with("agent-tracker/data/history.db"));
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_toml(
            r#"
            db_path = "/var/lib/tracker/./history.db"
            default_limit = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/tracker/history.db"));
        assert_eq!(config.default_limit, 20);
    }

    #[test]
    fn test_blank_db_path_falls_back_to_default() {
        let config = Config::from_toml(r#"db_path = """#).unwrap();
        assert_eq!(config.db_path, tracker_core::default_db_path());

        let mut config = Config::default();
        config.set_db_path("   ");
        assert_eq!(config.db_path, tracker_core::default_db_path());
        assert_ne!(config.db_path, PathBuf::new());
    }

    #[test]
    fn test_tilde_db_path() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let config = Config::from_toml(r#"db_path = "~/tracker/history.db""#).unwrap();
        assert_eq!(config.db_path, home.join("tracker").join("history.db"));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "default_limit = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_limit, 5);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "default_limit = \"many\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().starts_with("parse config"));
    }
}
