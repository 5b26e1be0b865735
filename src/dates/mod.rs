//! Date resolution for link records.
//!
//! A `DateResolver` runs an ordered list of independent strategies and keeps
//! the first date found. New date encodings are supported by adding a
//! strategy, never by changing the existing ones. When nothing matches, the
//! record's date is the explicit "unknown" sentinel.

pub mod strategies;

pub use strategies::{
    DateLayout, DateMatch, DateStrategy, Field, MonthDayWithHrefYear, PatternStrategy,
    default_strategies,
};

use tracing::trace;

use crate::links::{LinkRecord, ResolvedDate};

/// The strategy that produced a date, and what it found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub strategy: &'static str,
    pub found: DateMatch,
}

pub struct DateResolver {
    strategies: Vec<Box<dyn DateStrategy>>,
}

impl DateResolver {
    pub fn new() -> Self {
        Self::with_strategies(default_strategies())
    }

    pub fn with_strategies(strategies: Vec<Box<dyn DateStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// First strategy to find a date wins; later ones are not consulted.
    pub fn find(&self, record: &LinkRecord) -> Option<Resolution> {
        self.strategies.iter().find_map(|strategy| {
            let found = strategy.attempt(record)?;
            trace!("{} resolved {} via {}", record.href, found.date, strategy.name());
            Some(Resolution {
                strategy: strategy.name(),
                found,
            })
        })
    }

    pub fn resolve(&self, record: &LinkRecord) -> ResolvedDate {
        self.find(record)
            .map(|resolution| ResolvedDate::Known(resolution.found.date))
            .unwrap_or(ResolvedDate::Unknown)
    }

    /// Set `resolved_date` and `raw_date_text` on the record.
    pub fn apply(&self, record: &mut LinkRecord) {
        match self.find(record) {
            Some(resolution) => {
                record.resolved_date = ResolvedDate::Known(resolution.found.date);
                record.raw_date_text = Some(resolution.found.raw);
            }
            None => {
                record.resolved_date = ResolvedDate::Unknown;
                record.raw_date_text = None;
            }
        }
    }
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new()
    }
}
