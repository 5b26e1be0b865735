use std::collections::HashSet;
use std::path::Path;

use tracing::{info, warn};
use url::Url;

use crate::repositories::StoreError;

/// Hrefs that must never be discovered or retrieved again.
///
/// Loaded once per run and read-only afterwards. Entries match on the raw
/// href and on its base-joined absolute form.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    entries: HashSet<String>,
    base: Option<Url>,
}

impl ExclusionSet {
    pub fn new<I, S>(hrefs: I, base: Option<Url>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self {
            entries: HashSet::new(),
            base,
        };
        for href in hrefs {
            let href = href.as_ref().trim();
            if href.is_empty() {
                continue;
            }
            set.entries.insert(href.to_string());
            if let Some(normalized) = set.normalize(href) {
                set.entries.insert(normalized);
            }
        }
        set
    }

    /// Read the exclusion file. A missing or corrupt file is a configuration error.
    pub async fn load(path: &Path, base: Option<Url>) -> Result<Self, StoreError> {
        let hrefs = read_list(path, true).await?;
        info!("Loaded {} excluded urls from {}", hrefs.len(), path.display());
        Ok(Self::new(hrefs, base))
    }

    pub fn contains(&self, href: &str) -> bool {
        let href = href.trim();
        self.entries.contains(href)
            || self
                .normalize(href)
                .is_some_and(|normalized| self.entries.contains(&normalized))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn normalize(&self, href: &str) -> Option<String> {
        let url = match &self.base {
            Some(base) => base.join(href).ok()?,
            None => Url::parse(href).ok()?,
        };
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        Some(url.as_str().trim_end_matches('/').to_string())
    }
}

/// Append hrefs to the exclusion file, skipping ones already listed.
///
/// Returns how many were added. The file is created when missing.
pub async fn append_exclusions(path: &Path, hrefs: &[String]) -> Result<usize, StoreError> {
    let mut list = read_list(path, false).await?;
    let mut added = 0;

    for href in hrefs {
        if !list.iter().any(|existing| existing == href) {
            list.push(href.clone());
            added += 1;
            info!("Added url to exclude list: {}", href);
        }
    }

    if added > 0 {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&list)?;
        tokio::fs::write(path, json).await?;
    }

    Ok(added)
}

async fn read_list(path: &Path, required: bool) -> Result<Vec<String>, StoreError> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => return Ok(Vec::new()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice::<Vec<String>>(&raw) {
        Ok(list) => Ok(list),
        Err(e) if required => Err(StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
        Err(e) => {
            warn!("{} is not a json list ({}), starting a fresh one", path.display(), e);
            Ok(Vec::new())
        }
    }
}
