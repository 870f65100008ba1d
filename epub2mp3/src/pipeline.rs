//! Chapter conversion pipeline
//!
//! A fixed pool of workers pulls chapter jobs from a shared FIFO queue, runs
//! each through the retry policy around the TTS provider, writes finished
//! audio atomically, and records every outcome in the progress store.
//! Chapters the store already marks done are never enqueued, so re-running
//! the same book resumes where the last run stopped.

use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use tts_client::{SynthesisRequest, TtsError, TtsProvider};

use crate::jobs::{ChapterJob, JobOutcome};
use crate::progress::ProgressStore;
use crate::report::{self, Summary};
use crate::retry::{RetryDecision, RetryPolicy, RetryState};

/// Per-attempt ceiling; a stuck synthesis call counts as a transient failure
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub output_dir: PathBuf,
    /// Parallel conversions, must be >= 1
    pub concurrency: u32,
    pub max_retries: u32,
    /// Base unit for backoff delays
    pub base_delay: Duration,
    /// Ceiling for a single synthesis attempt
    pub attempt_timeout: Duration,
}

impl PipelineOptions {
    pub fn new(output_dir: impl Into<PathBuf>, concurrency: u32, max_retries: u32) -> Self {
        Self {
            output_dir: output_dir.into(),
            concurrency,
            max_retries,
            base_delay: crate::retry::DEFAULT_BASE_DELAY,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }

    /// Override backoff base delay (tests use milliseconds)
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.concurrency < 1 {
            bail!("concurrency must be at least 1");
        }
        Ok(())
    }
}

/// The chapter conversion pipeline
pub struct Pipeline {
    provider: Arc<dyn TtsProvider>,
    store: Arc<dyn ProgressStore>,
    options: PipelineOptions,
    progress: Option<ProgressBar>,
}

impl Pipeline {
    /// Create a pipeline. Fails fast on nonsensical configuration, before
    /// any job is scheduled.
    pub fn new(
        provider: Arc<dyn TtsProvider>,
        store: Arc<dyn ProgressStore>,
        options: PipelineOptions,
    ) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            provider,
            store,
            options,
            progress: None,
        })
    }

    /// Attach a progress bar ticked once per completed chapter
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Convert all chapters not already done, then summarize every chapter's
    /// fate. Per-chapter failures never abort sibling jobs; only a broken
    /// store or a panicked worker aborts the run.
    pub async fn run(&self, chapters: Vec<ChapterJob>) -> Result<Summary> {
        tokio::fs::create_dir_all(&self.options.output_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create output directory: {}",
                    self.options.output_dir.display()
                )
            })?;

        let mut pending: Vec<ChapterJob> = chapters
            .iter()
            .filter(|job| !self.store.is_done(job.index))
            .cloned()
            .collect();
        // FIFO by chapter index, so progress is observable in book order
        pending.sort_by_key(|job| job.index);

        if let Some(pb) = &self.progress {
            pb.set_length(pending.len() as u64);
        }

        if !pending.is_empty() {
            self.drain_queue(pending).await?;
        }

        let outcomes = self.store.outcomes();
        let summary = report::summarize(&chapters, &outcomes);

        // Every chapter settled, one way or the other
        self.store.mark_complete()?;

        Ok(summary)
    }

    /// FIFO queue by chapter index; each job is delivered to exactly one
    /// worker. Workers exit when the queue is drained.
    async fn drain_queue(&self, pending: Vec<ChapterJob>) -> Result<()> {
        let (tx, rx) = mpsc::channel(pending.len());
        for job in pending {
            // Capacity matches the job count, so the queue always has room
            tx.try_send(job).context("Failed to enqueue chapter job")?;
        }
        drop(tx);

        let rx = Arc::new(Mutex::new(rx));
        let policy = RetryPolicy::new(self.options.max_retries)
            .with_base_delay(self.options.base_delay);

        let mut workers = JoinSet::new();
        for _ in 0..self.options.concurrency {
            let rx = Arc::clone(&rx);
            let provider = Arc::clone(&self.provider);
            let store = Arc::clone(&self.store);
            let policy = policy.clone();
            let output_dir = self.options.output_dir.clone();
            let attempt_timeout = self.options.attempt_timeout;
            let progress = self.progress.clone();

            workers.spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else {
                        break;
                    };

                    let outcome =
                        process_job(&*provider, &policy, &output_dir, attempt_timeout, &job).await;

                    if let Some(pb) = &progress {
                        if let Some(error) = &outcome.error {
                            pb.println(format!(
                                "Chapter {} \"{}\" failed: {}",
                                job.index, job.title, error
                            ));
                        }
                        pb.inc(1);
                    }

                    store.record(outcome)?;
                }
                anyhow::Ok(())
            });
        }

        while let Some(joined) = workers.join_next().await {
            joined.context("Worker task panicked")??;
        }

        Ok(())
    }
}

/// Run one chapter to a terminal outcome: synthesize, write atomically,
/// retrying per policy. Never returns early with a non-terminal state.
async fn process_job(
    provider: &dyn TtsProvider,
    policy: &RetryPolicy,
    output_dir: &Path,
    attempt_timeout: Duration,
    job: &ChapterJob,
) -> JobOutcome {
    let mut state = RetryState::default();

    loop {
        state.attempts_made += 1;

        match attempt_job(provider, output_dir, attempt_timeout, job).await {
            Ok(path) => return JobOutcome::succeeded(job, state.attempts_made, path),
            Err(err) => {
                let kind = err.kind();
                let detail = err.to_string();

                match policy.next_action(state.attempts_made, kind) {
                    RetryDecision::Retry(delay) => {
                        state.last_error = Some((kind, detail));
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::Fail => {
                        return JobOutcome::failed(job, state.attempts_made, kind, detail);
                    }
                }
            }
        }
    }
}

/// One synthesis attempt: call the provider, then write the audio. Write
/// failures (disk full, permissions) classify as transient so they share the
/// retry budget.
async fn attempt_job(
    provider: &dyn TtsProvider,
    output_dir: &Path,
    attempt_timeout: Duration,
    job: &ChapterJob,
) -> std::result::Result<PathBuf, TtsError> {
    let request = SynthesisRequest::new(job.text.clone(), job.voice.clone());

    let audio = tokio::time::timeout(attempt_timeout, provider.synthesize(request))
        .await
        .map_err(|_| TtsError::Transient {
            message: format!("Synthesis timed out after {:?}", attempt_timeout),
        })??;

    let path = job.output_path(output_dir);
    write_atomic(&path, &audio)
        .await
        .map_err(|e| TtsError::Transient {
            message: format!("Failed to write {}: {}", path.display(), e),
        })?;

    Ok(path)
}

/// Write to a sibling temp path, then rename, so a crash never leaves a
/// half-written file at the final path.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("mp3.part");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
