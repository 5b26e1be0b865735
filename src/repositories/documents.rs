use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use md5::Context;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::StoreError;

/// Where retrieved documents live, keyed by canonical name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Store `bytes` under `name` and return how many bytes were written.
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<u64, StoreError>;
}

/// Documents as files in one directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// document either exists completely or not at all.
#[derive(Debug)]
pub struct FsDocumentStore {
    root: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Copy every `*.pdf` in `dir` that is not stored yet. Returns how many were copied.
    pub async fn import_dir(&self, dir: &Path) -> Result<usize, StoreError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No exception directory at {}", dir.display());
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let mut imported = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_pdf = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !is_pdf || !entry.file_type().await?.is_file() {
                continue;
            }
            if validate_name(name).is_err() {
                warn!("Skipping exception file with unusable name: {}", path.display());
                continue;
            }
            if self.exists(name).await? {
                debug!("Exception file {} already stored", name);
                continue;
            }

            let bytes = tokio::fs::read(&path).await?;
            self.save(name, &bytes).await?;
            imported += 1;
        }

        if imported > 0 {
            info!("Imported {} exception documents from {}", imported, dir.display());
        }
        Ok(imported)
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.path_for(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn save(&self, name: &str, bytes: &[u8]) -> Result<u64, StoreError> {
        let path = self.path_for(name)?;

        // Two requests for the same name must not interleave their writes
        let lock = self.lock_for(name);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.root).await?;
        let partial = self.root.join(format!(".{}.part", name));
        if let Err(e) = write_then_rename(&partial, &path, bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await
                && cleanup.kind() != std::io::ErrorKind::NotFound
            {
                warn!("Cannot remove {}: {}", partial.display(), cleanup);
            }
            return Err(e.into());
        }

        info!(
            "Stored {} ({} bytes, md5 {})",
            name,
            bytes.len(),
            checksum(bytes)
        );
        Ok(bytes.len() as u64)
    }
}

/// Plain file names only: no separators, no parent references, no hidden files.
fn validate_name(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name == "..";
    if invalid {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Context::new();
    hasher.consume(bytes);
    format!("{:x}", hasher.compute())
}

async fn write_then_rename(partial: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::write(partial, bytes).await?;
    tokio::fs::rename(partial, path).await
}
