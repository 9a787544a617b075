use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum MergeError {
    Config(String),
    SourceUnavailable {
        key: String,
        path: PathBuf,
        error: io::Error,
    },
    MalformedRecord {
        key: String,
        line: u64,
        reason: String,
    },
    Sink(io::Error),
    Worker(String),
    Io(io::Error),
    Json(serde_json::Error),
    Other(String),
}

impl MergeError {
    /// True for errors that only disqualify one source.
    pub fn is_source_local(&self) -> bool {
        matches!(
            self,
            MergeError::SourceUnavailable { .. } | MergeError::MalformedRecord { .. }
        )
    }
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::Config(e) => write!(f, "Configuration error: {}", e),
            MergeError::SourceUnavailable { key, path, error } => {
                write!(f, "Source {} unavailable ({}): {}", key, path.display(), error)
            }
            MergeError::MalformedRecord { key, line, reason } => {
                write!(f, "Malformed record in {} at line {}: {}", key, line, reason)
            }
            MergeError::Sink(e) => write!(f, "Output write failed: {}", e),
            MergeError::Worker(e) => write!(f, "Bootstrap worker failed: {}", e),
            MergeError::Io(e) => write!(f, "IO error: {}", e),
            MergeError::Json(e) => write!(f, "JSON error: {}", e),
            MergeError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MergeError::SourceUnavailable { error, .. } => Some(error),
            MergeError::Sink(e) | MergeError::Io(e) => Some(e),
            MergeError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MergeError {
    fn from(err: io::Error) -> Self {
        MergeError::Io(err)
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(err: serde_json::Error) -> Self {
        MergeError::Json(err)
    }
}

impl From<String> for MergeError {
    fn from(err: String) -> Self {
        MergeError::Other(err)
    }
}

impl From<&str> for MergeError {
    fn from(err: &str) -> Self {
        MergeError::Other(err.to_string())
    }
}
