//! Configuration and session storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::{Session, SessionStore};

const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Backend endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// REST base URL, e.g. `https://api.example.vn`
    pub api_url: String,
    /// Socket.IO base URL; defaults to `api_url` when unset
    pub socket_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            socket_url: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_base(&self) -> &str {
        self.socket_url.as_deref().unwrap_or(&self.api_url)
    }
}

/// Chat timers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// User-list refresh period
    pub user_poll_secs: u64,
    /// Open-conversation history refresh period
    pub history_poll_secs: u64,
    /// How long to wait for a requested history before giving up
    pub history_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            user_poll_secs: 3,
            history_poll_secs: 3,
            history_timeout_secs: 10,
        }
    }
}

impl ChatConfig {
    pub fn user_poll(&self) -> Duration {
        Duration::from_secs(self.user_poll_secs.max(1))
    }

    pub fn history_poll(&self) -> Duration {
        Duration::from_secs(self.history_poll_secs.max(1))
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_secs(self.history_timeout_secs.max(1))
    }
}

/// Application configuration
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    /// Stored login session (token, role claim, display name)
    pub session: Option<Session>,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("vn", "bus-admin", "bus-admin")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the bearer token)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }
}

impl SessionStore for Config {
    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn replace(&mut self, session: Session) {
        self.session = Some(session);
    }

    fn invalidate(&mut self) {
        self.session = None;
    }
}
