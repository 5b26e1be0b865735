use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::links::{LinkRecord, ResolvedDate};

/// Why a retrieval request failed (or, for `MalformedMarkup`, why discovery
/// came up empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnresolvableSource,
    TransientNetwork,
    PermanentHttp,
    InvalidContent,
    MalformedMarkup,
    Storage,
    /// The worker handling the request died before reporting.
    TaskFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnresolvableSource => "unresolvable_source",
            Self::TransientNetwork => "transient_network",
            Self::PermanentHttp => "permanent_http",
            Self::InvalidContent => "invalid_content",
            Self::MalformedMarkup => "malformed_markup",
            Self::Storage => "storage",
            Self::TaskFailed => "task_failed",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    #[default]
    Pdf,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
        }
    }
}

/// One document to fetch, keyed by its canonical name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub source_url: String,
    pub canonical_name: String,
    pub expected_format: DocumentFormat,
}

impl RetrievalRequest {
    pub fn new(source_url: impl Into<String>, date: &ResolvedDate, prefix: &str) -> Self {
        let source_url = source_url.into();
        let expected_format = DocumentFormat::Pdf;
        let canonical_name = canonical_name(prefix, &source_url, date, expected_format);
        Self {
            source_url,
            canonical_name,
            expected_format,
        }
    }

    /// Only standard records are retrieved.
    pub fn from_record(record: &LinkRecord, prefix: &str) -> Option<Self> {
        record
            .is_standard()
            .then(|| Self::new(record.href.trim(), &record.resolved_date, prefix))
    }
}

/// `{prefix}_{date}_{h}.{ext}` where `h` is the first 8 hex digits of the
/// md5 of the source url, so two documents sharing a date never collide.
pub fn canonical_name(
    prefix: &str,
    source_url: &str,
    date: &ResolvedDate,
    format: DocumentFormat,
) -> String {
    let digest = format!("{:x}", md5::compute(source_url.trim().as_bytes()));
    format!("{}_{}_{}.{}", prefix, date, &digest[..8], format.extension())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStatus {
    Saved,
    SkippedExisting,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    pub source_url: String,
    pub canonical_name: String,
    pub status: RetrievalStatus,
    pub bytes_written: u64,
    pub error_kind: Option<ErrorKind>,
    /// Fetch attempts made for this request.
    pub attempts: u32,
}

impl RetrievalOutcome {
    pub fn saved(request: &RetrievalRequest, bytes_written: u64, attempts: u32) -> Self {
        Self {
            source_url: request.source_url.clone(),
            canonical_name: request.canonical_name.clone(),
            status: RetrievalStatus::Saved,
            bytes_written,
            error_kind: None,
            attempts,
        }
    }

    pub fn skipped(request: &RetrievalRequest) -> Self {
        Self {
            source_url: request.source_url.clone(),
            canonical_name: request.canonical_name.clone(),
            status: RetrievalStatus::SkippedExisting,
            bytes_written: 0,
            error_kind: None,
            attempts: 0,
        }
    }

    pub fn failed(request: &RetrievalRequest, kind: ErrorKind, attempts: u32) -> Self {
        Self {
            source_url: request.source_url.clone(),
            canonical_name: request.canonical_name.clone(),
            status: RetrievalStatus::Failed,
            bytes_written: 0,
            error_kind: Some(kind),
            attempts,
        }
    }
}

/// Batch-level result: every outcome plus counts per status and error kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrievalSummary {
    pub outcomes: Vec<RetrievalOutcome>,
    pub saved: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub bytes_written: u64,
    pub failures: BTreeMap<ErrorKind, usize>,
}

impl RetrievalSummary {
    pub fn from_outcomes(outcomes: Vec<RetrievalOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in &outcomes {
            summary.bytes_written += outcome.bytes_written;
            match outcome.status {
                RetrievalStatus::Saved => summary.saved += 1,
                RetrievalStatus::SkippedExisting => summary.skipped_existing += 1,
                RetrievalStatus::Failed => summary.failed += 1,
            }
            if let Some(kind) = outcome.error_kind {
                *summary.failures.entry(kind).or_default() += 1;
            }
        }
        summary.outcomes = outcomes;
        summary
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Sources whose payload was not a valid document.
    pub fn invalid_sources(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.error_kind == Some(ErrorKind::InvalidContent))
            .map(|o| o.source_url.clone())
            .collect()
    }
}

impl Display for RetrievalSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} requests: {} saved, {} skipped (existing), {} failed, {} bytes written",
            self.total(),
            self.saved,
            self.skipped_existing,
            self.failed,
            self.bytes_written
        )?;
        if !self.failures.is_empty() {
            let breakdown: Vec<String> = self
                .failures
                .iter()
                .map(|(kind, count)| format!("{}={}", kind, count))
                .collect();
            write!(f, " [{}]", breakdown.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::LinkKind;
    use chrono::NaiveDate;

    fn date() -> ResolvedDate {
        ResolvedDate::Known(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
    }

    #[test]
    fn canonical_name_is_deterministic() {
        let a = RetrievalRequest::new("/files/minutes-2026-01-15.pdf", &date(), "voting_minutes");
        let b = RetrievalRequest::new("/files/minutes-2026-01-15.pdf", &date(), "voting_minutes");
        assert_eq!(a.canonical_name, b.canonical_name);
        assert!(a.canonical_name.starts_with("voting_minutes_2026-01-15_"));
        assert!(a.canonical_name.ends_with(".pdf"));
        assert_eq!(a.canonical_name.len(), "voting_minutes_2026-01-15_".len() + 8 + 4);
    }

    #[test]
    fn same_date_different_source_gets_distinct_names() {
        let a = RetrievalRequest::new("/files/a.pdf", &date(), "voting_minutes");
        let b = RetrievalRequest::new("/files/b.pdf", &date(), "voting_minutes");
        assert_ne!(a.canonical_name, b.canonical_name);
    }

    #[test]
    fn unknown_date_in_name() {
        let req = RetrievalRequest::new("/files/a.pdf", &ResolvedDate::Unknown, "voting_minutes");
        assert!(req.canonical_name.starts_with("voting_minutes_unknown_"));
    }

    #[test]
    fn only_standard_records_become_requests() {
        let mut record = LinkRecord::new("https://youtu.be/x", "video");
        record.kind = LinkKind::Video;
        assert!(RetrievalRequest::from_record(&record, "p").is_none());

        record.kind = LinkKind::Standard;
        assert!(RetrievalRequest::from_record(&record, "p").is_some());
    }

    #[test]
    fn summary_counts_by_status_and_kind() {
        let req = RetrievalRequest::new("/a.pdf", &date(), "p");
        let summary = RetrievalSummary::from_outcomes(vec![
            RetrievalOutcome::saved(&req, 100, 1),
            RetrievalOutcome::skipped(&req),
            RetrievalOutcome::failed(&req, ErrorKind::InvalidContent, 1),
            RetrievalOutcome::failed(&req, ErrorKind::TransientNetwork, 3),
            RetrievalOutcome::failed(&req, ErrorKind::TransientNetwork, 3),
        ]);

        assert_eq!(summary.total(), 5);
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.skipped_existing, 1);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.bytes_written, 100);
        assert_eq!(summary.failures[&ErrorKind::TransientNetwork], 2);
        assert_eq!(summary.invalid_sources(), vec!["/a.pdf".to_string()]);
        assert_eq!(
            summary.to_string(),
            "5 requests: 1 saved, 1 skipped (existing), 3 failed, 100 bytes written \
             [transient_network=2, invalid_content=1]"
        );
    }
}
