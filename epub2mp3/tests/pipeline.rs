// Integration tests for the chapter conversion pipeline

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use epub2mp3::jobs::{ChapterJob, JobStatus};
use epub2mp3::pipeline::{Pipeline, PipelineOptions};
use epub2mp3::progress::{FileStore, MemoryStore, ProgressStore, RunIdentity};
use tts_client::{MockProvider, SynthesisRequest, TtsError, TtsProvider};

fn chapters(titles: &[&str]) -> Vec<ChapterJob> {
    titles
        .iter()
        .enumerate()
        .map(|(index, title)| ChapterJob {
            index: index as u32,
            title: title.to_string(),
            text: format!("Text of chapter {}", index),
            voice: "alloy".to_string(),
        })
        .collect()
}

fn options(output_dir: &Path, concurrency: u32, max_retries: u32) -> PipelineOptions {
    PipelineOptions::new(output_dir, concurrency, max_retries)
        .with_base_delay(Duration::from_millis(1))
}

fn mp3_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_end_to_end_all_success() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(MockProvider::always_succeeds(b"mp3"));
    let store = Arc::new(MemoryStore::new());

    let pipeline = Pipeline::new(
        provider.clone(),
        store.clone(),
        options(temp.path(), 2, 3),
    )
    .unwrap();

    let summary = pipeline
        .run(chapters(&["Intro", "Ch1", "Ch2"]))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.failed.is_empty());
    assert_eq!(
        mp3_files(temp.path()),
        vec!["000_Intro.mp3", "001_Ch1.mp3", "002_Ch2.mp3"]
    );
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_rate_limited_then_success_and_permanent_failure() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(
        MockProvider::always_succeeds(b"mp3")
            .script_for(
                "Text of chapter 0",
                vec![
                    Err(TtsError::RateLimited {
                        message: "throttled".to_string(),
                    }),
                    Err(TtsError::RateLimited {
                        message: "throttled".to_string(),
                    }),
                    Ok(b"mp3".to_vec()),
                ],
            )
            .script_for(
                "Text of chapter 1",
                vec![Err(TtsError::Permanent {
                    message: "invalid voice".to_string(),
                })],
            ),
    );
    let store = Arc::new(MemoryStore::new());

    let pipeline =
        Pipeline::new(provider.clone(), store.clone(), options(temp.path(), 2, 2)).unwrap();
    let summary = pipeline.run(chapters(&["Intro", "Broken"])).await.unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].index, 1);
    assert_eq!(summary.failed[0].title, "Broken");
    assert_eq!(summary.failed[0].error, "Permanent");

    let outcomes = store.outcomes();
    assert_eq!(outcomes[&0].status, JobStatus::Succeeded);
    assert_eq!(outcomes[&0].attempts, 3);
    assert_eq!(outcomes[&1].status, JobStatus::FailedPermanent);
    assert_eq!(outcomes[&1].attempts, 1);
}

#[tokio::test]
async fn test_transient_failures_exhaust_retry_budget() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(MockProvider::always_fails(TtsError::Transient {
        message: "connection reset".to_string(),
    }));
    let store = Arc::new(MemoryStore::new());

    let max_retries = 2;
    let pipeline = Pipeline::new(
        provider.clone(),
        store.clone(),
        options(temp.path(), 1, max_retries),
    )
    .unwrap();
    let summary = pipeline.run(chapters(&["Intro"])).await.unwrap();

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed.len(), 1);

    // Exactly max_retries + 1 attempts, never more
    let outcomes = store.outcomes();
    assert_eq!(outcomes[&0].attempts, max_retries + 1);
    assert_eq!(provider.call_count() as u32, max_retries + 1);
}

#[tokio::test]
async fn test_permanent_failure_spends_no_retries() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(MockProvider::always_fails(TtsError::Permanent {
        message: "malformed text".to_string(),
    }));
    let store = Arc::new(MemoryStore::new());

    let pipeline =
        Pipeline::new(provider.clone(), store.clone(), options(temp.path(), 1, 5)).unwrap();
    let summary = pipeline.run(chapters(&["Intro"])).await.unwrap();

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(store.outcomes()[&0].attempts, 1);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_resume_skips_succeeded_chapters() {
    let temp = TempDir::new().unwrap();
    let output_dir = temp.path().join("out");
    let state_dir = temp.path().join("state");
    let identity = RunIdentity::new(&temp.path().join("book.epub"), "alloy", &output_dir);

    let first_provider = Arc::new(MockProvider::always_succeeds(b"mp3"));
    let store = Arc::new(FileStore::open(&state_dir, &identity).unwrap());
    let pipeline =
        Pipeline::new(first_provider.clone(), store, options(&output_dir, 2, 3)).unwrap();
    pipeline
        .run(chapters(&["Intro", "Ch1", "Ch2"]))
        .await
        .unwrap();
    assert_eq!(first_provider.call_count(), 3);

    // Second run over the same (book, voice, output dir): nothing re-synthesized
    let second_provider = Arc::new(MockProvider::always_succeeds(b"mp3"));
    let store = Arc::new(FileStore::open(&state_dir, &identity).unwrap());
    let pipeline =
        Pipeline::new(second_provider.clone(), store, options(&output_dir, 2, 3)).unwrap();
    let summary = pipeline
        .run(chapters(&["Intro", "Ch1", "Ch2"]))
        .await
        .unwrap();

    assert_eq!(second_provider.call_count(), 0);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.failed.is_empty());
}

#[tokio::test]
async fn test_resume_retries_previously_failed_chapters() {
    let temp = TempDir::new().unwrap();
    let output_dir = temp.path().join("out");
    let state_dir = temp.path().join("state");
    let identity = RunIdentity::new(&temp.path().join("book.epub"), "alloy", &output_dir);

    // First run: chapter 1 fails permanently
    let first_provider = Arc::new(MockProvider::always_succeeds(b"mp3").script_for(
        "Text of chapter 1",
        vec![Err(TtsError::Permanent {
            message: "service rejected input".to_string(),
        })],
    ));
    let store = Arc::new(FileStore::open(&state_dir, &identity).unwrap());
    let pipeline =
        Pipeline::new(first_provider, store, options(&output_dir, 2, 1)).unwrap();
    let summary = pipeline.run(chapters(&["Intro", "Flaky"])).await.unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed.len(), 1);

    // Second run: only the failed chapter is re-attempted
    let second_provider = Arc::new(MockProvider::always_succeeds(b"mp3"));
    let store = Arc::new(FileStore::open(&state_dir, &identity).unwrap());
    let pipeline =
        Pipeline::new(second_provider.clone(), store, options(&output_dir, 2, 1)).unwrap();
    let summary = pipeline.run(chapters(&["Intro", "Flaky"])).await.unwrap();

    assert_eq!(second_provider.call_count(), 1);
    assert_eq!(summary.succeeded, 2);
    assert!(summary.failed.is_empty());
}

/// Tracks how many synthesize calls run at once
struct SlowProvider {
    in_flight: AtomicUsize,
    max_seen: AtomicUsize,
}

impl SlowProvider {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TtsProvider for SlowProvider {
    async fn synthesize(&self, _request: SynthesisRequest) -> tts_client::Result<Vec<u8>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(b"mp3".to_vec())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test]
async fn test_concurrency_cap_is_respected() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(SlowProvider::new());
    let store = Arc::new(MemoryStore::new());

    let concurrency = 2;
    let pipeline = Pipeline::new(
        provider.clone(),
        store,
        options(temp.path(), concurrency, 0),
    )
    .unwrap();
    let summary = pipeline
        .run(chapters(&["A", "B", "C", "D", "E", "F", "G", "H"]))
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 8);
    assert!(provider.max_seen.load(Ordering::SeqCst) <= concurrency as usize);
}

#[tokio::test]
async fn test_rerun_produces_identical_file_set() {
    let temp = TempDir::new().unwrap();
    let titles = ["Intro", "Ch1", "Ch2"];

    // Fresh store each run, so the second run re-synthesizes everything
    for _ in 0..2 {
        let provider = Arc::new(MockProvider::always_succeeds(b"mp3"));
        let store = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(provider, store, options(temp.path(), 2, 3)).unwrap();
        let summary = pipeline.run(chapters(&titles)).await.unwrap();
        assert_eq!(summary.succeeded, titles.len());
        assert!(summary.failed.is_empty());
    }

    assert_eq!(
        mp3_files(temp.path()),
        vec!["000_Intro.mp3", "001_Ch1.mp3", "002_Ch2.mp3"]
    );
}

#[tokio::test]
async fn test_failed_chapter_leaves_no_output_file() {
    let temp = TempDir::new().unwrap();
    let provider = Arc::new(MockProvider::always_fails(TtsError::Permanent {
        message: "rejected".to_string(),
    }));
    let store = Arc::new(MemoryStore::new());

    let pipeline = Pipeline::new(provider, store, options(temp.path(), 1, 0)).unwrap();
    pipeline.run(chapters(&["Intro"])).await.unwrap();

    assert!(mp3_files(temp.path()).is_empty());
}
