//! Durable per-run progress tracking
//!
//! Each conversion run is keyed by a stable identity derived from the source
//! book, voice, and output directory. Outcomes are recorded incrementally so
//! a crash mid-run loses nothing already completed, and a re-run of the same
//! (book, voice, output dir) combination skips finished chapters. A different
//! voice or output dir hashes to a different run and starts fresh.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::jobs::JobOutcome;

/// Stable key identifying a (book, voice, output dir) combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    pub book_id: String,
    pub voice: String,
    pub output_dir: String,
}

impl RunIdentity {
    /// Derive the identity from run inputs. The book is identified by its
    /// canonical path (falling back to the given path if it does not resolve).
    pub fn new(epub_path: &Path, voice: &str, output_dir: &Path) -> Self {
        let canonical = fs::canonicalize(epub_path).unwrap_or_else(|_| epub_path.to_path_buf());
        let book_id = hex_digest(canonical.to_string_lossy().as_bytes());

        Self {
            book_id,
            voice: voice.to_string(),
            output_dir: output_dir.to_string_lossy().into_owned(),
        }
    }

    /// Short stable id used as the state filename. First 16 hex chars of the
    /// digest - short enough for a filename, long enough to never collide in
    /// practice.
    pub fn run_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.book_id.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.voice.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.output_dir.as_bytes());
        let mut id = hex_digest_of(hasher);
        id.truncate(16);
        id
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_digest_of(hasher)
}

fn hex_digest_of(hasher: Sha256) -> String {
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Injected progress store seam; implementations must be safe under
/// concurrent workers recording distinct chapter indices.
pub trait ProgressStore: Send + Sync {
    /// Snapshot of all recorded outcomes, keyed by chapter index
    fn outcomes(&self) -> HashMap<u32, JobOutcome>;

    /// Upsert one outcome. Recording the same index twice overwrites
    /// (last write wins).
    fn record(&self, outcome: JobOutcome) -> Result<()>;

    /// Whether this chapter already succeeded in a prior run
    fn is_done(&self, index: u32) -> bool;

    /// Mark the run settled (every chapter succeeded or exhausted)
    fn mark_complete(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RunState {
    book_id: String,
    voice: String,
    output_dir: String,
    started_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    outcomes: HashMap<u32, JobOutcome>,
}

impl RunState {
    fn new(identity: &RunIdentity) -> Self {
        Self {
            book_id: identity.book_id.clone(),
            voice: identity.voice.clone(),
            output_dir: identity.output_dir.clone(),
            started_at: Utc::now(),
            completed_at: None,
            outcomes: HashMap::new(),
        }
    }
}

/// File-backed progress store, one JSON file per run identity
pub struct FileStore {
    path: PathBuf,
    state: Mutex<RunState>,
}

impl FileStore {
    /// Get the default run-state directory: ~/.config/cli-programs/epub2mp3-runs
    pub fn default_state_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("epub2mp3-runs"))
    }

    /// Open the store for a run, loading prior progress if any exists
    pub fn open(state_dir: &Path, identity: &RunIdentity) -> Result<Self> {
        let path = state_dir.join(format!("{}.json", identity.run_id()));

        let state = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read run state: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse run state: {}", path.display()))?
        } else {
            RunState::new(identity)
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    fn save(&self, state: &RunState) -> Result<()> {
        let dir = self.path.parent().unwrap();

        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = serde_json::to_string_pretty(state).context("Failed to serialize run state")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write run state: {}", self.path.display()))?;

        Ok(())
    }
}

impl ProgressStore for FileStore {
    fn outcomes(&self) -> HashMap<u32, JobOutcome> {
        self.state.lock().unwrap().outcomes.clone()
    }

    fn record(&self, outcome: JobOutcome) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.outcomes.insert(outcome.index, outcome);
        self.save(&state)
    }

    fn is_done(&self, index: u32) -> bool {
        self.state
            .lock()
            .unwrap()
            .outcomes
            .get(&index)
            .is_some_and(|outcome| outcome.is_done())
    }

    fn mark_complete(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.completed_at = Some(Utc::now());
        self.save(&state)
    }
}

/// In-memory progress store for tests. Data is lost on drop.
#[derive(Default)]
pub struct MemoryStore {
    outcomes: Mutex<HashMap<u32, JobOutcome>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    fn outcomes(&self) -> HashMap<u32, JobOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    fn record(&self, outcome: JobOutcome) -> Result<()> {
        self.outcomes.lock().unwrap().insert(outcome.index, outcome);
        Ok(())
    }

    fn is_done(&self, index: u32) -> bool {
        self.outcomes
            .lock()
            .unwrap()
            .get(&index)
            .is_some_and(|outcome| outcome.is_done())
    }
}
