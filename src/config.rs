//! Runtime settings read from `config.yml` in the platform config directory.
//!
//! Every field has a default, so a missing or partial file is fine. The
//! data directory can be overridden with `TABDESK_DATA_DIR`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const DATA_DIR_ENV: &str = "TABDESK_DATA_DIR";
pub const LOG_ENV: &str = "TABDESK_LOG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_autosave_secs")]
    pub autosave_secs: u64,
    #[serde(default = "default_layout_debounce_ms")]
    pub layout_debounce_ms: u64,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default = "default_widget_ids")]
    pub default_widgets: Vec<String>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridConfig {
    #[serde(default = "default_columns")]
    pub columns: u16,
    /// Terminal rows per grid row.
    #[serde(default = "default_row_height")]
    pub row_height: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("could not locate a home directory for tabdesk")]
    NoProjectDirs,
}

fn default_autosave_secs() -> u64 {
    30
}

fn default_layout_debounce_ms() -> u64 {
    500
}

fn default_columns() -> u16 {
    12
}

fn default_row_height() -> u16 {
    3
}

pub fn default_widget_ids() -> Vec<String> {
    ["bookmarks", "tasks", "notes", "tools-px"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_log_filter() -> String {
    "tabdesk=info".to_string()
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            columns: default_columns(),
            row_height: default_row_height(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: None,
            autosave_secs: default_autosave_secs(),
            layout_debounce_ms: default_layout_debounce_ms(),
            grid: GridConfig::default(),
            default_widgets: default_widget_ids(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        let mut config: Config = serde_yaml::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    /// Reads `config.yml` from the platform config directory when it exists,
    /// then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(config)
    }

    pub fn resolve_data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let dirs = ProjectDirs::from("", "", "tabdesk").ok_or(ConfigError::NoProjectDirs)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs)
    }

    pub fn layout_debounce(&self) -> Duration {
        Duration::from_millis(self.layout_debounce_ms)
    }

    fn normalize(&mut self) {
        self.autosave_secs = self.autosave_secs.max(1);
        self.grid.columns = self.grid.columns.clamp(1, 48);
        self.grid.row_height = self.grid.row_height.max(1);
        if self.default_widgets.is_empty() {
            self.default_widgets = default_widget_ids();
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tabdesk").map(|dirs| dirs.config_dir().join("config.yml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.grid.columns, 12);
        assert_eq!(config.autosave_secs, 30);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse("autosave_secs: 10\ngrid:\n  row_height: 4\n").unwrap();
        assert_eq!(config.autosave_secs, 10);
        assert_eq!(config.grid.row_height, 4);
        assert_eq!(config.grid.columns, 12);
        assert_eq!(config.layout_debounce_ms, 500);
        assert_eq!(config.default_widgets, default_widget_ids());
    }

    #[test]
    fn zero_values_are_normalized() {
        let config = Config::parse("autosave_secs: 0\ngrid:\n  columns: 0\ndefault_widgets: []\n").unwrap();
        assert_eq!(config.autosave_secs, 1);
        assert_eq!(config.grid.columns, 1);
        assert_eq!(config.default_widgets.len(), 4);
    }

    #[test]
    fn explicit_data_dir_wins() {
        let config = Config {
            data_dir: Some(PathBuf::from("/tmp/tabdesk-test")),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_data_dir().unwrap(),
            PathBuf::from("/tmp/tabdesk-test")
        );
    }

    #[test]
    fn unreadable_file_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope.yml");
        let err = Config::from_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("nope.yml"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "grid: [1, 2").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
