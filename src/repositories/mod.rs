pub mod documents;
pub mod records;
pub mod stats;

pub use documents::{DocumentStore, FsDocumentStore};
pub use records::{JsonRecordStore, RecordStore};
pub use stats::StatsLog;

#[cfg(test)]
pub use documents::MockDocumentStore;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("required file is missing: {}", .0.display())]
    Missing(PathBuf),

    #[error("{} is corrupt: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("invalid document name: {0}")]
    InvalidName(String),
}
