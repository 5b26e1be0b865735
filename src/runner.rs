//! Whole-run orchestration shared by the binaries.
//!
//! Configuration-level failures (missing exclusion list, unreadable record
//! store, board page unreachable) end the run with an error. Per-document
//! failures only show up in the returned summary.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{Instrument, info, info_span, warn};
use url::Url;
use uuid::Uuid;

use crate::config::Config;
use crate::dates::DateResolver;
use crate::discovery::{DiscoveryPipeline, DiscoveryReport};
use crate::fetcher::{Transport, fetch_page};
use crate::links::{ExclusionSet, LinkFilterChain, MarkupLinkExtractor, append_exclusions};
use crate::repositories::{FsDocumentStore, JsonRecordStore, RecordStore, StatsLog};
use crate::retrieval::{
    PdfValidator, RetrievalPipeline, RetrievalRequest, RetrievalSummary, RetryPolicy, UrlResolver,
};

fn base_url(config: &Config) -> Result<Url> {
    Url::parse(config.base_url()).with_context(|| format!("invalid base url {}", config.base_url()))
}

async fn load_exclusions(config: &Config, base: &Url) -> Result<ExclusionSet> {
    let path = config.exclude_list_path();
    ExclusionSet::load(&path, Some(base.clone()))
        .await
        .with_context(|| format!("cannot load exclusion list {}", path.display()))
}

/// Fetch the board page (following pagination), discover links and persist them.
pub async fn run_discovery(config: &Config, transport: &dyn Transport) -> Result<DiscoveryReport> {
    let run_id = Uuid::new_v4();
    async {
        let base = base_url(config)?;
        let exclusions = load_exclusions(config, &base).await?;
        let pipeline = DiscoveryPipeline::new(
            MarkupLinkExtractor::new(),
            DateResolver::new(),
            LinkFilterChain::new(exclusions, config.patterns()),
        );

        let mut next = Some(
            Url::parse(config.target_url())
                .with_context(|| format!("invalid target url {}", config.target_url()))?,
        );
        let mut visited = HashSet::new();
        let mut records = Vec::new();

        while let Some(url) = next.take() {
            if visited.len() >= config.max_pages() || !visited.insert(url.clone()) {
                break;
            }

            let page = fetch_page(transport, url.as_str(), config.request_timeout())
                .await
                .with_context(|| format!("cannot fetch {}", url))?;
            let found = pipeline.extractor().extract(&page.body_utf8);
            info!("Found {} links on {}", found.len(), page.url_final);
            records.extend(found);

            next = pipeline.extractor().next_page(&page.body_utf8, &page.url_final);
        }

        let report = pipeline.process(records);

        JsonRecordStore::new(config.minutes_links_path())
            .save_all(&report.standard())
            .await
            .context("cannot save minutes links")?;
        JsonRecordStore::new(config.video_links_path())
            .save_all(&report.videos())
            .await
            .context("cannot save video links")?;
        StatsLog::new(config.stats_log_path())
            .append(Utc::now().date_naive(), &report.stats)
            .await
            .context("cannot append link stats")?;

        Ok::<_, anyhow::Error>(report)
    }
    .instrument(info_span!("discovery", run_id = %run_id))
    .await
}

/// Download every stored minutes link that is not excluded or already present.
pub async fn run_retrieval(
    config: &Config,
    transport: Arc<dyn Transport>,
) -> Result<RetrievalSummary> {
    let run_id = Uuid::new_v4();
    async {
        let base = base_url(config)?;
        let records = JsonRecordStore::new(config.minutes_links_path())
            .load_all()
            .await
            .context("cannot read minutes links")?;
        let exclusions = load_exclusions(config, &base).await?;

        let requests: Vec<RetrievalRequest> = records
            .iter()
            .filter(|record| {
                let excluded = exclusions.contains(&record.href);
                if excluded {
                    info!("Skipping excluded link {}", record.href);
                }
                !excluded
            })
            .filter_map(|record| RetrievalRequest::from_record(record, config.document_prefix()))
            .collect();

        let pipeline = RetrievalPipeline::new(
            transport,
            Arc::new(FsDocumentStore::new(config.download_dir())),
            Arc::new(PdfValidator::new()),
            UrlResolver::new(base, config.patterns()),
            RetryPolicy::from_config(config),
        )
        .with_concurrency(config.concurrency());

        let summary = pipeline.run(requests).await;

        let invalid = summary.invalid_sources();
        if !invalid.is_empty() {
            let path = config.exclude_list_path();
            let added = append_exclusions(&path, &invalid)
                .await
                .with_context(|| format!("cannot update exclusion list {}", path.display()))?;
            warn!("Excluded {} links that served invalid documents", added);
        }

        info!("Retrieval finished: {}", summary);
        Ok::<_, anyhow::Error>(summary)
    }
    .instrument(info_span!("retrieval", run_id = %run_id))
    .await
}

/// Copy manually supplied documents into the download directory.
pub async fn import_exceptions(config: &Config) -> Result<usize> {
    let dir = config.exception_dir();
    FsDocumentStore::new(config.download_dir())
        .import_dir(&dir)
        .await
        .with_context(|| format!("cannot import exception documents from {}", dir.display()))
}
