use std::io;

use thiserror::Error;

/// Why the alarm list refused a request. None of these change any state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Alarm({0}) already exists")]
    AlreadyExists(u32),

    #[error("Alarm({0}) does not exist")]
    DoesNotExist(u32),

    #[error("alarm list is closed")]
    Closed,
}

/// Conditions the engine cannot recover from.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("couldn't spawn {name} thread: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("internal inconsistency: {0}")]
    Inconsistent(String),

    #[error("{0} thread panicked")]
    ThreadPanicked(String),
}

impl EngineError {
    pub(crate) fn spawn(name: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid time format {0:?}")]
    TimeFormat(String),

    #[error("couldn't determine a config directory")]
    NoConfigDir,
}
