//! Configuration loading and validation.
//!
//! Settings come from an optional TOML file, then environment variables on
//! top. Secrets usually arrive through the environment.

use crate::error::{ConfigError, Result};

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_ACTIVATION_KEYWORD: &str = "START";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Mimicbot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub discord: DiscordConfig,

    /// Generation service configuration.
    pub llm: LlmConfig,

    /// Exact message text, posted by the bot itself, that switches a channel on.
    pub activation_keyword: String,

    /// Directory for daily rolling log files. Terminal only when unset.
    pub log_dir: Option<PathBuf>,
}

#[derive(Clone)]
pub struct DiscordConfig {
    pub token: String,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Generation service configuration.
#[derive(Clone)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API, without the `/chat/completions` suffix.
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    /// Socket-level timeout for the HTTP client.
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    activation_keyword: Option<String>,
    log_dir: Option<PathBuf>,
    #[serde(default)]
    discord: TomlDiscordConfig,
    #[serde(default)]
    llm: TomlLlmConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlDiscordConfig {
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlLlmConfig {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl Config {
    /// Default config file location: `<config_dir>/mimicbot/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("mimicbot"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Load from `path` if given, otherwise from the default location.
    ///
    /// A missing default file is fine; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::load_from_path(&path)
                } else {
                    Self::from_toml_str("", env_var)
                }
            }
        }
    }

    /// Load from a specific config file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Load {
            path: path.display().to_string(),
            source: Arc::new(error),
        })?;

        Self::from_toml_str(&content, env_var)
    }

    /// Parse TOML content, then apply overrides from `env`.
    pub fn from_toml_str(content: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let toml: TomlConfig =
            toml::from_str(content).map_err(|error| ConfigError::Parse(error.to_string()))?;

        let token = env("DISCORD_TOKEN")
            .or(toml.discord.token)
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey("discord.token (DISCORD_TOKEN)".into()))?;

        let api_key = env("GROQ_API_KEY")
            .or(toml.llm.api_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey("llm.api_key (GROQ_API_KEY)".into()))?;

        let model = env("MIMICBOT_MODEL")
            .or(toml.llm.model)
            .unwrap_or_else(|| DEFAULT_MODEL.into());

        let activation_keyword = env("MIMICBOT_ACTIVATION_KEYWORD")
            .or(toml.activation_keyword)
            .unwrap_or_else(|| DEFAULT_ACTIVATION_KEYWORD.into());

        // Markers are compared after trimming, so a keyword with surrounding
        // whitespace could never match.
        if activation_keyword.trim().is_empty() || activation_keyword.trim() != activation_keyword
        {
            return Err(ConfigError::Invalid(format!(
                "activation_keyword must be non-empty with no surrounding whitespace, got {activation_keyword:?}"
            ))
            .into());
        }

        if model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".into()).into());
        }

        let request_timeout_secs = toml
            .llm
            .request_timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if request_timeout_secs == 0 {
            return Err(
                ConfigError::Invalid("llm.request_timeout_secs must be positive".into()).into(),
            );
        }

        Ok(Self {
            discord: DiscordConfig { token },
            llm: LlmConfig {
                api_base: toml.llm.api_base.unwrap_or_else(|| DEFAULT_API_BASE.into()),
                api_key,
                model,
                request_timeout_secs,
            },
            activation_keyword,
            log_dir: toml.log_dir,
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
