use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Console settings. Nothing in here changes how the engine schedules
/// alarms, the buffer capacity and message bound are fixed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// chrono strftime format for timestamps in console output
    #[serde(default = "default_time_format")]
    pub time_format: String,
    /// print the whole alarm list and display list after every change
    #[serde(default)]
    pub show_lists: bool,
}

fn default_prompt() -> String {
    "Alarm > ".to_string()
}

fn default_time_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            time_format: default_time_format(),
            show_lists: false,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&config)?;
        config.validate()?;
        Ok(config)
    }

    /// like [`load`](Self::load), but a missing file means defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, config)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = directories::ProjectDirs::from("", "", "alarm_cond")
            .ok_or(ConfigError::NoConfigDir)?
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    /// rejects a time format chrono would fail to render
    fn validate(&self) -> Result<(), ConfigError> {
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::TimeFormat(self.time_format.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_gives_back_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            prompt: "> ".to_string(),
            time_format: "%H:%M".to_string(),
            show_lists: true,
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "show_lists = true\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert!(config.show_lists);
        assert_eq!(config.prompt, "Alarm > ");
        assert_eq!(config.time_format, default_time_format());
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn bad_time_format_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "time_format = \"%Q\"\n").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::TimeFormat(_))
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "prompt = \n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }
}
