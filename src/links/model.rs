use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const UNKNOWN_DATE: &str = "unknown";

/// How a link is treated downstream. Exactly one per record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    #[default]
    Standard,
    ClientSide,
    Video,
}

/// A normalized `YYYY-MM-DD` date or the explicit "unknown" sentinel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolvedDate {
    Known(NaiveDate),
    #[default]
    Unknown,
}

impl ResolvedDate {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Known(date) => Some(*date),
            Self::Unknown => None,
        }
    }

    /// Parse a stored value. Anything that is not a real `YYYY-MM-DD` date
    /// (including older `yyyy-mm-dd` placeholders) reads back as unknown.
    pub fn parse(value: &str) -> Self {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map(Self::Known)
            .unwrap_or(Self::Unknown)
    }
}

impl Display for ResolvedDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

impl From<NaiveDate> for ResolvedDate {
    fn from(date: NaiveDate) -> Self {
        Self::Known(date)
    }
}

impl Serialize for ResolvedDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResolvedDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// One anchor found on the board page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub href: String,
    #[serde(rename = "body", default)]
    pub display_text: String,
    /// Text the resolved date was read from, when a strategy matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_date_text: Option<String>,
    #[serde(rename = "date", default)]
    pub resolved_date: ResolvedDate,
    #[serde(default)]
    pub kind: LinkKind,
}

impl LinkRecord {
    pub fn new(href: impl Into<String>, display_text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            display_text: display_text.into(),
            raw_date_text: None,
            resolved_date: ResolvedDate::Unknown,
            kind: LinkKind::Standard,
        }
    }

    pub fn is_standard(&self) -> bool {
        self.kind == LinkKind::Standard
    }
}
