use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Component, Path};
use tracing::warn;

/// Environment variable that overrides `telegram.bot_token`.
pub const TOKEN_ENV_VAR: &str = "TELEGRAM_BOT_TOKEN";

/// How the async runtime schedules command handlers.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Multi-threaded runtime, handlers run on worker threads
    #[default]
    Threaded,
    /// Single-threaded runtime, handlers are interleaved on one thread
    Cooperative,
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeMode::Threaded => write!(f, "threaded"),
            RuntimeMode::Cooperative => write!(f, "cooperative"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Users allowed to talk to the bot. Empty means everyone.
    #[serde(default)]
    pub allowed_user_ids: Vec<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownloaderConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_output_template")]
    pub output_template: String,
    /// Prepended to queries that are not URLs so the extractor searches instead.
    #[serde(default = "default_search_prefix")]
    pub search_prefix: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            format: default_format(),
            output_template: default_output_template(),
            search_prefix: default_search_prefix(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub mode: RuntimeMode,
}

fn default_binary() -> String {
    "yt-dlp".to_string()
}

fn default_format() -> String {
    "bestaudio/best".to_string()
}

fn default_output_template() -> String {
    "%(title)s.%(ext)s".to_string()
}

fn default_search_prefix() -> String {
    "ytsearch:".to_string()
}

impl Config {
    /// Whether a message from `user_id` may use the bot. Messages without a
    /// sender are only admitted when there is no allow-list.
    pub fn is_user_allowed(&self, user_id: Option<u64>) -> bool {
        if self.telegram.allowed_user_ids.is_empty() {
            return true;
        }
        user_id.is_some_and(|id| self.telegram.allowed_user_ids.contains(&id))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Replace the configured token with `value` when it is set and non-empty.
    pub fn apply_token_override(&mut self, value: Option<String>) {
        if let Some(token) = value.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!(
                "No bot token: set {} or telegram.bot_token in the config file",
                TOKEN_ENV_VAR
            );
        }
        if self.downloader.binary.trim().is_empty() {
            anyhow::bail!("downloader.binary must not be empty");
        }

        // Downloads must land inside the per-request directory
        let template = Path::new(&self.downloader.output_template);
        if self.downloader.output_template.trim().is_empty()
            || template.is_absolute()
            || template
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            anyhow::bail!(
                "downloader.output_template must be a relative path without '..': {}",
                self.downloader.output_template
            );
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        } else {
            warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            Config::default()
        };

        config.apply_token_override(std::env::var(TOKEN_ENV_VAR).ok());
        config.validate()?;

        Ok(config)
    }
}
