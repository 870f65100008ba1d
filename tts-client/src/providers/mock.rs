//! Mock TTS provider for testing
//!
//! Not suitable for production use; exists so downstream crates can exercise
//! retry and scheduling logic without a real synthesis service.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{Result, TtsError};
use crate::provider::{SynthesisRequest, TtsProvider};

/// A provider that replays scripted responses.
///
/// Responses can be scripted per input text with [`MockProvider::script_for`];
/// requests with no remaining scripted response get the fallback result.
pub struct MockProvider {
    script: Mutex<HashMap<String, VecDeque<Result<Vec<u8>>>>>,
    fallback: Result<Vec<u8>>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a provider that returns `audio` for every request
    pub fn always_succeeds(audio: &[u8]) -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            fallback: Ok(audio.to_vec()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a provider that fails every request with `error`
    pub fn always_fails(error: TtsError) -> Self {
        Self {
            script: Mutex::new(HashMap::new()),
            fallback: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue responses for requests whose text equals `text`.
    ///
    /// Responses are consumed in order; once exhausted, the fallback applies.
    pub fn script_for(self, text: &str, responses: Vec<Result<Vec<u8>>>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_default()
            .extend(responses);
        self
    }

    /// Number of synthesize calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsProvider for MockProvider {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self
            .script
            .lock()
            .unwrap()
            .get_mut(&request.text)
            .and_then(|queue| queue.pop_front());

        match scripted {
            Some(response) => response,
            None => self.fallback.clone(),
        }
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}
