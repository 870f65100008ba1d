//! Chapter job and outcome types

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tts_client::ErrorKind;

/// Characters that are unsafe in filenames across platforms
static ILLEGAL_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// One chapter to convert. Immutable once created.
#[derive(Debug, Clone)]
pub struct ChapterJob {
    /// Position in the book, contiguous from 0
    pub index: u32,
    pub title: String,
    pub text: String,
    pub voice: String,
}

impl ChapterJob {
    /// Output filename for this chapter: zero-padded index plus sanitized title.
    ///
    /// A pure function of index and title, so re-runs always target the same
    /// path regardless of completion order.
    pub fn output_filename(&self) -> String {
        format!("{:03}_{}.mp3", self.index, sanitize_title(&self.title))
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.output_filename())
    }
}

/// Strip characters that are invalid in filenames
pub fn sanitize_title(title: &str) -> String {
    let cleaned = ILLEGAL_FILENAME_CHARS.replace_all(title.trim(), "");
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.into_owned()
    }
}

/// Terminal state of a chapter job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Succeeded,
    FailedPermanent,
}

/// Result of processing one chapter, recorded in the progress store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub index: u32,
    pub title: String,
    pub status: JobStatus,
    /// Synthesis attempts made, always >= 1
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl JobOutcome {
    pub fn succeeded(job: &ChapterJob, attempts: u32, output_path: PathBuf) -> Self {
        Self {
            index: job.index,
            title: job.title.clone(),
            status: JobStatus::Succeeded,
            attempts,
            error_kind: None,
            error: None,
            output_path: Some(output_path),
        }
    }

    pub fn failed(job: &ChapterJob, attempts: u32, kind: ErrorKind, detail: String) -> Self {
        Self {
            index: job.index,
            title: job.title.clone(),
            status: JobStatus::FailedPermanent,
            attempts,
            error_kind: Some(kind),
            error: Some(detail),
            output_path: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}
