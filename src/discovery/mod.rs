//! Markup in, dated and classified link records out.

use serde::Serialize;
use tracing::info;

use crate::dates::DateResolver;
use crate::links::{LinkFilterChain, LinkKind, LinkRecord, MarkupLinkExtractor};

/// Per-run link counts, one row of the stats log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Anchors found before any filtering.
    pub total_links: usize,
    pub client_side_links: usize,
    pub excluded_links: usize,
    pub duplicate_links: usize,
    pub video_links: usize,
    /// Standard records, i.e. retrieval candidates.
    pub minutes_links: usize,
}

/// Everything that survived the filter chain, plus counts.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub records: Vec<LinkRecord>,
    pub stats: LinkStats,
}

impl DiscoveryReport {
    pub fn standard(&self) -> Vec<LinkRecord> {
        self.of_kind(LinkKind::Standard)
    }

    pub fn videos(&self) -> Vec<LinkRecord> {
        self.of_kind(LinkKind::Video)
    }

    pub fn client_side(&self) -> Vec<LinkRecord> {
        self.of_kind(LinkKind::ClientSide)
    }

    fn of_kind(&self, kind: LinkKind) -> Vec<LinkRecord> {
        self.records
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect()
    }
}

pub struct DiscoveryPipeline {
    extractor: MarkupLinkExtractor,
    dates: DateResolver,
    filters: LinkFilterChain,
}

impl DiscoveryPipeline {
    pub fn new(extractor: MarkupLinkExtractor, dates: DateResolver, filters: LinkFilterChain) -> Self {
        Self {
            extractor,
            dates,
            filters,
        }
    }

    pub fn extractor(&self) -> &MarkupLinkExtractor {
        &self.extractor
    }

    /// Extract, date and filter the links of one page.
    pub fn run(&self, html: &str) -> DiscoveryReport {
        self.process(self.extractor.extract(html))
    }

    /// Date and filter already-extracted records (e.g. from several pages).
    pub fn process(&self, mut records: Vec<LinkRecord>) -> DiscoveryReport {
        let total_links = records.len();

        for record in &mut records {
            self.dates.apply(record);
        }

        let (records, counts) = self.filters.apply_counted(records);

        let mut stats = LinkStats {
            total_links,
            excluded_links: counts.excluded,
            duplicate_links: counts.duplicates,
            ..LinkStats::default()
        };
        for record in &records {
            match record.kind {
                LinkKind::Standard => stats.minutes_links += 1,
                LinkKind::ClientSide => stats.client_side_links += 1,
                LinkKind::Video => stats.video_links += 1,
            }
        }

        info!(
            "Discovered {} links: {} minutes, {} video, {} client-side, {} excluded, {} duplicate",
            stats.total_links,
            stats.minutes_links,
            stats.video_links,
            stats.client_side_links,
            stats.excluded_links,
            stats.duplicate_links
        );

        DiscoveryReport { records, stats }
    }
}
