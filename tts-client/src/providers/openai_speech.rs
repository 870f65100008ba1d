//! OpenAI-compatible speech synthesis provider
//!
//! Used for services that implement the OpenAI `/v1/audio/speech` API:
//! - OpenAI itself
//! - Local OpenAI-compatible TTS servers (kokoro-fastapi, openedai-speech, ...)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TtsError};
use crate::provider::{SynthesisRequest, TtsProvider};

const DEFAULT_MODEL: &str = "tts-1";

/// Provider for OpenAI-compatible speech APIs
pub struct OpenAiSpeechProvider {
    model: String,
    base_url: String,
    api_key: Option<String>,
    name: &'static str,
    client: Client,
}

impl OpenAiSpeechProvider {
    /// Create a new OpenAI-compatible speech provider
    pub fn new(
        model: &str,
        base_url: &str,
        api_key: Option<String>,
        name: &'static str,
    ) -> Result<Self> {
        let client = Client::new();

        Ok(Self {
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            name,
            client,
        })
    }

    /// Create an OpenAI provider
    pub fn openai(model: Option<&str>, api_key: String) -> Result<Self> {
        Self::new(
            model.unwrap_or(DEFAULT_MODEL),
            "https://api.openai.com/v1",
            Some(api_key),
            "OpenAI",
        )
    }

    /// Create a provider for a local OpenAI-compatible server (no API key required)
    pub fn local(model: Option<&str>, base_url: Option<&str>) -> Result<Self> {
        let url = base_url.unwrap_or("http://127.0.0.1:8880/v1");
        Self::new(model.unwrap_or(DEFAULT_MODEL), url, None, "Local TTS")
    }
}

// Speech API request/response types

#[derive(Debug, Serialize)]
struct SpeechRequest {
    model: String,
    input: String,
    voice: String,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl TtsProvider for OpenAiSpeechProvider {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<Vec<u8>> {
        let speech_request = SpeechRequest {
            model: self.model.clone(),
            input: request.text,
            voice: request.voice,
            response_format: "mp3",
        };

        let url = format!("{}/audio/speech", self.base_url);

        let mut request_builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        // Only add Authorization header if API key is provided
        if let Some(ref api_key) = self.api_key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request_builder
            .json(&speech_request)
            .send()
            .await
            .map_err(|e| TtsError::Transient {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message =
                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            return Err(TtsError::from_status(status.as_u16(), message));
        }

        let audio = response.bytes().await.map_err(|e| TtsError::Transient {
            message: format!("Failed to read audio response: {}", e),
        })?;

        Ok(audio.to_vec())
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> Result<()> {
        // API key was provided in constructor
        Ok(())
    }
}
