use crate::validate::Violation;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("expected a `Search.setIndex(...)` envelope")]
    MissingEnvelope,
    #[error("malformed index payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] bincode::Error),
    #[error("invalid index: {0}")]
    Invalid(Violation),
}

impl IndexError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IndexError::Io { path: path.into(), source }
    }
}
