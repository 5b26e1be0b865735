use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::config::LinkPatterns;
use crate::links::{
    exclusions::ExclusionSet,
    model::{LinkKind, LinkRecord},
};

/// Drops records listed in the exclusion set.
#[derive(Debug, Clone)]
pub struct ExclusionFilter {
    exclusions: ExclusionSet,
}

impl ExclusionFilter {
    pub fn new(exclusions: ExclusionSet) -> Self {
        Self { exclusions }
    }

    pub fn process(&self, records: Vec<LinkRecord>) -> Vec<LinkRecord> {
        records
            .into_iter()
            .filter(|record| !self.exclusions.contains(&record.href))
            .collect()
    }
}

/// Keeps the first record for each href.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFilter;

impl DuplicateFilter {
    pub fn process(&self, records: Vec<LinkRecord>) -> Vec<LinkRecord> {
        let mut seen = HashSet::new();
        records
            .into_iter()
            .filter(|record| seen.insert(record.href.trim().to_string()))
            .collect()
    }
}

/// Marks browser-handled links (`mailto:`, `tel:`, fragments, scripts).
#[derive(Debug, Clone)]
pub struct ClientSideSeparator {
    prefixes: Vec<String>,
}

impl ClientSideSeparator {
    pub fn new(prefixes: &[String]) -> Self {
        Self {
            prefixes: prefixes.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, href: &str) -> bool {
        let href = href.trim().to_lowercase();
        self.prefixes.iter().any(|prefix| href.starts_with(prefix))
    }

    pub fn process(&self, records: Vec<LinkRecord>) -> Vec<LinkRecord> {
        reclassify(records, LinkKind::ClientSide, |href| self.matches(href))
    }
}

/// Marks links to video-hosting services.
#[derive(Debug, Clone)]
pub struct VideoSeparator {
    hosts: Vec<String>,
}

impl VideoSeparator {
    pub fn new(hosts: &[String]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.to_lowercase()).collect(),
        }
    }

    pub fn matches(&self, href: &str) -> bool {
        let href = href.to_lowercase();
        self.hosts.iter().any(|host| href.contains(host.as_str()))
    }

    pub fn process(&self, records: Vec<LinkRecord>) -> Vec<LinkRecord> {
        reclassify(records, LinkKind::Video, |href| self.matches(href))
    }
}

/// Only standard records are reclassified, so a record carries one kind.
fn reclassify(
    mut records: Vec<LinkRecord>,
    kind: LinkKind,
    matches: impl Fn(&str) -> bool,
) -> Vec<LinkRecord> {
    for record in records.iter_mut() {
        if record.is_standard() && matches(&record.href) {
            record.kind = kind;
        }
    }
    records
}

/// The closed set of filter stages.
#[derive(Debug, Clone)]
pub enum LinkFilter {
    Exclusion(ExclusionFilter),
    Deduplicate(DuplicateFilter),
    ClientSide(ClientSideSeparator),
    Video(VideoSeparator),
}

impl LinkFilter {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Exclusion(_) => "exclusion",
            Self::Deduplicate(_) => "deduplicate",
            Self::ClientSide(_) => "client_side",
            Self::Video(_) => "video",
        }
    }

    pub fn process(&self, records: Vec<LinkRecord>) -> Vec<LinkRecord> {
        match self {
            Self::Exclusion(f) => f.process(records),
            Self::Deduplicate(f) => f.process(records),
            Self::ClientSide(f) => f.process(records),
            Self::Video(f) => f.process(records),
        }
    }
}

/// Records removed by the dropping stages of one chain run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub excluded: usize,
    pub duplicates: usize,
}

/// Exclusion, then de-duplication, then the two reclassifying separators.
#[derive(Debug, Clone)]
pub struct LinkFilterChain {
    stages: Vec<LinkFilter>,
}

impl LinkFilterChain {
    pub fn new(exclusions: ExclusionSet, patterns: &LinkPatterns) -> Self {
        Self {
            stages: vec![
                LinkFilter::Exclusion(ExclusionFilter::new(exclusions)),
                LinkFilter::Deduplicate(DuplicateFilter),
                LinkFilter::ClientSide(ClientSideSeparator::new(&patterns.client_side_prefixes)),
                LinkFilter::Video(VideoSeparator::new(&patterns.video_hosts)),
            ],
        }
    }

    pub fn stages(&self) -> &[LinkFilter] {
        &self.stages
    }

    pub fn apply(&self, records: Vec<LinkRecord>) -> Vec<LinkRecord> {
        self.apply_counted(records).0
    }

    pub fn apply_counted(&self, records: Vec<LinkRecord>) -> (Vec<LinkRecord>, FilterCounts) {
        let mut counts = FilterCounts::default();
        let mut records = records;

        for stage in &self.stages {
            let before = records.len();
            records = stage.process(records);
            let removed = before - records.len();
            debug!("Filter {} removed {} of {} links", stage.name(), removed, before);

            match stage {
                LinkFilter::Exclusion(_) => counts.excluded += removed,
                LinkFilter::Deduplicate(_) => counts.duplicates += removed,
                LinkFilter::ClientSide(_) | LinkFilter::Video(_) => {}
            }
        }

        (records, counts)
    }
}
