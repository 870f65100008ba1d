//! TTS provider trait and request types

use async_trait::async_trait;

use crate::error::Result;

/// A single synthesis request
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Text to speak
    pub text: String,
    /// Voice identifier, provider-specific
    pub voice: String,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
        }
    }
}

/// TTS provider trait - all synthesis backends implement this
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesize text to audio bytes (MP3)
    async fn synthesize(&self, request: SynthesisRequest) -> Result<Vec<u8>>;

    /// Provider name
    fn name(&self) -> &'static str;

    /// Check whether the provider is usable (keys present, etc.)
    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}
