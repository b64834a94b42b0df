// YAML configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "YARDBOOK_CONFIG";

/// What `delete` does when the record is absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Deleting an absent record is a no-op
    #[default]
    Lenient,
    /// Deleting an absent record fails with `NotFound`
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Raise the level by `steps` (from repeated `-v`)
    pub fn raised(self, steps: u8) -> LogLevel {
        const ORDER: [LogLevel; 5] = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let current = ORDER.iter().position(|l| *l == self).unwrap_or(1);
        ORDER[(current + steps as usize).min(ORDER.len() - 1)]
    }

    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Store file location; relative paths resolve against the working directory
    pub store_path: PathBuf,
    pub delete_policy: DeletePolicy,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("yardbook.jsonl"),
            delete_policy: DeletePolicy::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Default config file location: `<config_dir>/yardbook/config.yml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("yardbook").join("config.yml"))
    }

    /// Config file that `load` reads, if any
    ///
    /// An explicit path (argument, then `YARDBOOK_CONFIG`) is returned as is;
    /// the default location only when it exists.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        explicit
            .map(Path::to_path_buf)
            .or(from_env)
            .or_else(|| Self::default_path().filter(|p| p.exists()))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, a missing default file
    /// gives defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store_path, PathBuf::from("yardbook.jsonl"));
        assert_eq!(config.delete_policy, DeletePolicy::Lenient);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = Config::from_yaml("delete_policy: strict\n").unwrap();
        assert_eq!(config.delete_policy, DeletePolicy::Strict);
        assert_eq!(config.store_path, PathBuf::from("yardbook.jsonl"));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_keys() {
        assert!(matches!(
            Config::from_yaml("store: x.jsonl\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        fs::write(&path, "store_path: /srv/yard/records.jsonl\nlog_level: debug\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/srv/yard/records.jsonl"));
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.yml");
        assert_eq!(Config::locate(Some(&missing)), Some(missing.clone()));
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_log_level_raised() {
        assert_eq!(LogLevel::Warn.raised(0), LogLevel::Warn);
        assert_eq!(LogLevel::Warn.raised(2), LogLevel::Debug);
        assert_eq!(LogLevel::Warn.raised(9), LogLevel::Trace);
    }
}
