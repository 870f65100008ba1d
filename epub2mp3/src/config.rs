// epub2mp3 configuration management

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_VOICE: &str = "alloy";
const DEFAULT_CONCURRENCY: u32 = 3;
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epub2Mp3Config {
    /// TTS provider to use
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Default voice
    #[serde(default = "default_voice")]
    pub voice: String,

    /// Maximum parallel conversions
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Maximum retries per chapter
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Model identifier for the provider (None uses the provider default)
    #[serde(default)]
    pub model: Option<String>,

    /// Base URL override for OpenAI-compatible servers
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_voice() -> String {
    DEFAULT_VOICE.to_string()
}

fn default_concurrency() -> u32 {
    DEFAULT_CONCURRENCY
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for Epub2Mp3Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            voice: default_voice(),
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            model: None,
            base_url: None,
            api_key_env: None,
        }
    }
}

impl Epub2Mp3Config {
    /// Get the config file path: ~/.config/cli-programs/epub2mp3.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("epub2mp3.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Epub2Mp3Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }
}
