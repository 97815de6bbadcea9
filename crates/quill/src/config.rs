//! Resolved settings for the daemon and one-shot commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use quill_sprint::MessagingError;
use quill_sprint::ports::Messenger;

use crate::messenger::{DiscordMessenger, LogMessenger};

/// Errors in command-line or environment settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("poll interval must be at least one second")]
    ZeroPollInterval,

    #[error("no data directory found for this platform; pass --database")]
    NoDataDir,

    #[error("failed to create database directory {path}: {reason}")]
    CreateDir { path: PathBuf, reason: String },

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

/// Discord credentials. Without them messages only go to the log.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub api_base: String,
}

/// Configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub database: PathBuf,
    pub poll_interval: Duration,
    pub discord: Option<DiscordConfig>,
}

impl DaemonConfig {
    pub fn new(
        database: PathBuf,
        poll_interval_secs: u64,
        discord: Option<DiscordConfig>,
    ) -> Result<Self, ConfigError> {
        if poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(Self {
            database,
            poll_interval: Duration::from_secs(poll_interval_secs),
            discord,
        })
    }
}

/// `<data dir>/quill/quill.db`.
pub fn default_database_path() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("quill").join("quill.db"))
        .ok_or(ConfigError::NoDataDir)
}

/// Use `explicit` if given, otherwise the default path. Creates the parent directory.
pub fn resolve_database(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    let path = match explicit {
        Some(path) => path,
        None => default_database_path()?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir(parent)?;
    }
    Ok(path)
}

fn create_dir(path: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(path).map_err(|e| ConfigError::CreateDir {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// The Discord messenger if credentials are configured, otherwise the log.
pub fn build_messenger(discord: Option<&DiscordConfig>) -> Result<Arc<dyn Messenger>, ConfigError> {
    Ok(match discord {
        Some(discord) => Arc::new(DiscordMessenger::new(
            discord.api_base.clone(),
            discord.token.clone(),
        )?),
        None => Arc::new(LogMessenger),
    })
}
