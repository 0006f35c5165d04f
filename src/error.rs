//! Error types for notestash
//!
//! The taxonomy follows the failure policy of the repository:
//! per-note read failures are isolated during a scan, write failures abort
//! the enclosing operation, and cleanup failures are logged and swallowed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Read error at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt sidecar at {path}: {reason}")]
    SidecarCorrupt { path: PathBuf, reason: String },

    #[error("Staged media missing: {filename}")]
    MediaMove {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Write error at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Delete error at {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A note titled '{0}' already exists")]
    TitleTaken(String),

    #[error("Note not found: {0}")]
    NotFound(String),

    #[error("Nothing to save")]
    EmptyNote,

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl NoteError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read { path: path.into(), source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }

    pub(crate) fn delete(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Delete { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, NoteError>;
