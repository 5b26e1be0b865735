use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use super::StoreError;
use crate::links::LinkRecord;

/// Persisted list of link records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every stored record; an absent store is empty.
    async fn load_all(&self) -> Result<Vec<LinkRecord>, StoreError>;

    /// Replace the stored records.
    async fn save_all(&self, records: &[LinkRecord]) -> Result<(), StoreError>;
}

/// Records as a pretty-printed JSON array (`href`, `body`, `date` keys).
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn load_all(&self) -> Result<Vec<LinkRecord>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    async fn save_all(&self, records: &[LinkRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&self.path, json).await?;
        info!("Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}
