//! epub2mp3 - convert an EPUB e-book into per-chapter MP3 files
//!
//! The core is the chapter conversion pipeline: bounded-concurrency workers
//! over a shared job queue, class-aware retry with backoff, durable progress
//! tracking for resume, and a final per-chapter summary. EPUB extraction and
//! the TTS client are thin collaborators around it.

pub mod config;
pub mod epub;
pub mod jobs;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod retry;

pub use jobs::{ChapterJob, JobOutcome, JobStatus};
pub use pipeline::{Pipeline, PipelineOptions};
pub use progress::{FileStore, MemoryStore, ProgressStore, RunIdentity};
pub use report::Summary;
