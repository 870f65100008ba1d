//! Shared TTS client library
//!
//! Provides a provider trait over remote speech-synthesis services, a
//! classified error taxonomy for retry decisions, an OpenAI-compatible HTTP
//! implementation, and a scriptable mock for tests.

pub mod error;
pub mod provider;
pub mod providers;

pub use error::{ErrorKind, Result, TtsError};
pub use provider::{SynthesisRequest, TtsProvider};
pub use providers::{MockProvider, OpenAiSpeechProvider, ProviderOptions, get_provider};
