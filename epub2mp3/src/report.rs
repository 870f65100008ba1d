//! Final run summary

use std::collections::HashMap;

use crate::jobs::{ChapterJob, JobOutcome, JobStatus};

/// A chapter that did not convert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedChapter {
    pub index: u32,
    pub title: String,
    /// Final error class, or "not attempted" for abandoned chapters
    pub error: String,
}

/// Aggregated fate of every chapter in the run
#[derive(Debug, Clone)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedChapter>,
}

impl Summary {
    /// Whether the run finished with no permanent failures
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Join the full chapter list with recorded outcomes. Every chapter appears
/// exactly once: succeeded, failed with its error class, or failed as
/// "not attempted" when no outcome was recorded.
pub fn summarize(chapters: &[ChapterJob], outcomes: &HashMap<u32, JobOutcome>) -> Summary {
    let mut succeeded = 0;
    let mut failed = Vec::new();

    for chapter in chapters {
        match outcomes.get(&chapter.index) {
            Some(outcome) if outcome.status == JobStatus::Succeeded => succeeded += 1,
            Some(outcome) => failed.push(FailedChapter {
                index: chapter.index,
                title: chapter.title.clone(),
                error: outcome
                    .error_kind
                    .map(|kind| kind.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
            None => failed.push(FailedChapter {
                index: chapter.index,
                title: chapter.title.clone(),
                error: "not attempted".to_string(),
            }),
        }
    }

    failed.sort_by_key(|f| f.index);

    Summary {
        total: chapters.len(),
        succeeded,
        failed,
    }
}

/// Print the summary to stderr
pub fn print_summary(summary: &Summary) {
    eprintln!();
    eprintln!(
        "Converted {}/{} chapters",
        summary.succeeded, summary.total
    );

    if !summary.failed.is_empty() {
        eprintln!("The following chapters failed to convert:");
        for chapter in &summary.failed {
            eprintln!(
                "  - Chapter {} \"{}\" ({})",
                chapter.index, chapter.title, chapter.error
            );
        }
    }
}
