//! Configuration management for embed-bot

#[path = "config_tests.rs"]
mod config_tests;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Complete bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token from the Discord developer portal
    #[serde(default)]
    pub bot_token: String,
    /// Text shown in the bot's "Competing in" activity
    #[serde(default = "default_activity_name")]
    pub activity_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// 0 keeps builder sessions until the process exits
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            file_name: default_file_name(),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl StorageConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

impl LifecycleConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn session_idle(&self) -> Option<Duration> {
        (self.session_idle_secs > 0).then(|| Duration::from_secs(self.session_idle_secs))
    }
}

/// Source of environment variables
pub trait ReadEnv {
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_impl(&SystemEnv)
    }

    pub(crate) fn from_env_impl(env: &impl ReadEnv) -> Result<Self> {
        let bot_token = env.var("DISCORD_TOKEN").unwrap_or_default();
        let activity_name = env
            .var("EMBED_ACTIVITY_NAME")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(default_activity_name);
        let data_dir = env
            .var("EMBED_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let flush_interval_secs = parse_secs(env, "EMBED_FLUSH_INTERVAL_SECS")?
            .unwrap_or_else(default_flush_interval_secs);
        let session_idle_secs = parse_secs(env, "EMBED_SESSION_IDLE_SECS")?
            .unwrap_or_else(default_session_idle_secs);

        Ok(Config {
            discord: DiscordConfig {
                bot_token,
                activity_name,
            },
            storage: StorageConfig {
                data_dir,
                file_name: default_file_name(),
            },
            lifecycle: LifecycleConfig {
                flush_interval_secs,
                session_idle_secs,
            },
        })
    }

    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            bail!("Discord bot token is not configured (set DISCORD_TOKEN or discord.bot_token)");
        }
        if self.lifecycle.flush_interval_secs == 0 {
            bail!("lifecycle.flush_interval_secs must be greater than zero");
        }
        if self.storage.file_name.trim().is_empty() {
            bail!("storage.file_name must not be empty");
        }
        Ok(())
    }
}

fn parse_secs(env: &impl ReadEnv, key: &str) -> Result<Option<u64>> {
    match env.var(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, raw)),
        _ => Ok(None),
    }
}

fn default_activity_name() -> String {
    "Embed Builder".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_file_name() -> String {
    "embeds.json".to_string()
}

fn default_flush_interval_secs() -> u64 {
    300
}

fn default_session_idle_secs() -> u64 {
    3600
}
