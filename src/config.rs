use crate::MergeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;
pub const DEFAULT_FILES_PER_WORKER: usize = 10;

/// What to do with a line the codec rejects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Stop reading the source at the first bad line.
    #[default]
    Abort,
    /// Log the line, count it, keep reading.
    Skip,
}

/// Runtime settings for one merge run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub input_dir: PathBuf,
    pub output_path: PathBuf,
    pub workers: usize,
    /// Records read from one source per load.
    pub chunk_size: usize,
    /// Maximum number of source files open at once.
    pub handle_budget: usize,
    pub malformed: MalformedPolicy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./input"),
            output_path: PathBuf::from("./merged.txt"),
            workers: DEFAULT_WORKERS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            handle_budget: DEFAULT_WORKERS * DEFAULT_FILES_PER_WORKER,
            malformed: MalformedPolicy::Abort,
        }
    }
}

impl MergeConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Reads a JSON config file; missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, MergeError> {
        let text = fs::read_to_string(path).map_err(|e| {
            MergeError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_handle_budget(mut self, handle_budget: usize) -> Self {
        self.handle_budget = handle_budget;
        self
    }

    pub fn with_malformed(mut self, malformed: MalformedPolicy) -> Self {
        self.malformed = malformed;
        self
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.workers == 0 {
            return Err(MergeError::Config("workers must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(MergeError::Config("chunk_size must be at least 1".into()));
        }
        if self.handle_budget == 0 {
            return Err(MergeError::Config("handle_budget must be at least 1".into()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(MergeError::Config("output_path is empty".into()));
        }
        Ok(())
    }
}
