use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::StoreError;
use crate::discovery::LinkStats;

const HEADER: &str = "run_date,total_links,client_side_links,excluded_links,duplicate_links,video_links,minutes_links";

/// Append-only CSV with one row of link counts per discovery run.
#[derive(Debug, Clone)]
pub struct StatsLog {
    path: PathBuf,
}

impl StatsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a row, writing the header first when the file is new or empty.
    pub async fn append(&self, run_date: NaiveDate, stats: &LinkStats) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let needs_header = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let mut out = String::new();
        if needs_header {
            out.push_str(HEADER);
            out.push('\n');
        }
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            run_date.format("%Y-%m-%d"),
            stats.total_links,
            stats.client_side_links,
            stats.excluded_links,
            stats.duplicate_links,
            stats.video_links,
            stats.minutes_links
        ));

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(out.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended link stats to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: usize) -> LinkStats {
        LinkStats {
            total_links: total,
            client_side_links: 2,
            excluded_links: 1,
            duplicate_links: 0,
            video_links: 3,
            minutes_links: total - 6,
        }
    }

    #[tokio::test]
    async fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = StatsLog::new(dir.path().join("logs/link_stats_log.csv"));

        log.append(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(), &stats(10))
            .await
            .unwrap();
        log.append(NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(), &stats(12))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "2026-01-15,10,2,1,0,3,4");
        assert_eq!(lines[2], "2026-01-16,12,2,1,0,3,6");
    }
}
