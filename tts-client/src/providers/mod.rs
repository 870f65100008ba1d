//! TTS provider implementations

pub mod mock;
pub mod openai_speech;

pub use mock::MockProvider;
pub use openai_speech::OpenAiSpeechProvider;

use crate::error::{Result, TtsError};
use crate::provider::TtsProvider;

const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// Provider selection options, typically sourced from the caller's config
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    /// Model identifier, provider-specific (None uses the provider default)
    pub model: Option<String>,
    /// Base URL override for OpenAI-compatible servers
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
}

/// Create a TTS provider by name
pub fn get_provider(name: &str, options: &ProviderOptions) -> Result<Box<dyn TtsProvider>> {
    match name {
        "openai" => {
            let env_var = options.api_key_env.as_deref().unwrap_or(OPENAI_KEY_ENV);
            let api_key =
                std::env::var(env_var).map_err(|_| TtsError::MissingApiKey {
                    provider: "OpenAI".to_string(),
                    env_var: env_var.to_string(),
                })?;
            let provider = OpenAiSpeechProvider::openai(options.model.as_deref(), api_key)?;
            Ok(Box::new(provider))
        }
        "local" => {
            let provider =
                OpenAiSpeechProvider::local(options.model.as_deref(), options.base_url.as_deref())?;
            Ok(Box::new(provider))
        }
        _ => Err(TtsError::ConfigError(format!(
            "Unknown TTS provider: {}. Available: openai, local",
            name
        ))),
    }
}
