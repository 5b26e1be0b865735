use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::NaiveDate;
use percent_encoding::percent_decode_str;
use regex::{Captures, Regex};

use crate::links::LinkRecord;

/// Month names and their common abbreviations; always capture group 1 of the
/// month-name patterns it is spliced into.
const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTH}\.?[\s,]+(\d{{1,2}})(?:st|nd|rd|th)?(?:\s*,\s*|\s+)(\d{{4}})\b"
    ))
    .unwrap()
});

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTH}\.?,?\s+(\d{{4}})\b"
    ))
    .unwrap()
});

static NUMERIC_MDY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d])(\d{1,2})[-/._](\d{1,2})[-/._](\d{4}|\d{2})(?:[^\d]|$)").unwrap()
});

static ISO_YMD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d])(\d{4})[-_.](\d{1,2})[-_.](\d{1,2})(?:[^\d]|$)").unwrap()
});

static PATH_YMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d{4})/(\d{1,2})/(\d{1,2})(?:[/?#]|$)").unwrap());

static COMPACT_YMD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d])((?:19|20)\d{2})(\d{2})(\d{2})(?:[^\d]|$)").unwrap()
});

static LOOSE_MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:^|[^a-z]){MONTH}(?:[^a-z\d][^\d]*?)?(\d{{1,2}})[^\d]*(\d{{4}})(?:[^\d]|$)"
    ))
    .unwrap()
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{MONTH}\.?[\s,]+(\d{{1,2}})(?:st|nd|rd|th)?\b")).unwrap()
});

static LONE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\d])((?:19|20)\d{2})(?:[^\d]|$)").unwrap());

/// A date found by a strategy, with the text it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMatch {
    pub date: NaiveDate,
    pub raw: String,
}

/// One way of finding a date on a link record.
///
/// A strategy that cannot find its pattern returns `None`; it never fails.
pub trait DateStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn attempt(&self, record: &LinkRecord) -> Option<DateMatch>;
}

/// Which part of the record a pattern strategy reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    DisplayText,
    /// The href after percent-decoding.
    Href,
}

impl Field {
    fn read<'a>(&self, record: &'a LinkRecord) -> Cow<'a, str> {
        match self {
            Self::DisplayText => Cow::Borrowed(record.display_text.as_str()),
            Self::Href => percent_decode_str(&record.href).decode_utf8_lossy(),
        }
    }
}

/// Date layouts understood by [`PatternStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `January 15, 2026`, `Jan. 15th 2026`
    MonthNameDayYear,
    /// `15 January 2026`, `15th of Jan 2026`
    DayMonthNameYear,
    /// `1-15-26`, `01/15/2026`
    NumericMonthDayYear,
    /// `2026-01-15`, `2026_1_15`
    IsoYearMonthDay,
    /// `/2026/01/15/`
    PathYearMonthDay,
    /// `20260115`
    CompactYearMonthDay,
    /// `January%2015%2C%202026`, `minutes_january_15_2026`
    LooseMonthNameDayYear,
}

impl DateLayout {
    fn regex(&self) -> &'static Regex {
        match self {
            Self::MonthNameDayYear => &MONTH_DAY_YEAR,
            Self::DayMonthNameYear => &DAY_MONTH_YEAR,
            Self::NumericMonthDayYear => &NUMERIC_MDY,
            Self::IsoYearMonthDay => &ISO_YMD,
            Self::PathYearMonthDay => &PATH_YMD,
            Self::CompactYearMonthDay => &COMPACT_YMD,
            Self::LooseMonthNameDayYear => &LOOSE_MONTH_DAY_YEAR,
        }
    }

    /// Capture group index of (year, month, day).
    fn groups(&self) -> (usize, usize, usize) {
        match self {
            Self::MonthNameDayYear | Self::LooseMonthNameDayYear => (3, 1, 2),
            Self::DayMonthNameYear => (3, 2, 1),
            Self::NumericMonthDayYear => (3, 1, 2),
            Self::IsoYearMonthDay | Self::PathYearMonthDay | Self::CompactYearMonthDay => {
                (1, 2, 3)
            }
        }
    }

    fn date_from(&self, caps: &Captures<'_>) -> Option<NaiveDate> {
        let (y, m, d) = self.groups();
        let year = parse_year(caps.get(y)?.as_str())?;
        let month_text = caps.get(m)?.as_str();
        let month = month_text
            .parse::<u32>()
            .ok()
            .or_else(|| month_number(month_text))?;
        let day = caps.get(d)?.as_str().parse::<u32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Looks for one date layout in one field of the record.
#[derive(Debug, Clone)]
pub struct PatternStrategy {
    name: &'static str,
    field: Field,
    layout: DateLayout,
}

impl PatternStrategy {
    pub fn new(name: &'static str, field: Field, layout: DateLayout) -> Self {
        Self {
            name,
            field,
            layout,
        }
    }
}

impl DateStrategy for PatternStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn attempt(&self, record: &LinkRecord) -> Option<DateMatch> {
        let text = self.field.read(record);
        self.layout.regex().captures_iter(&text).find_map(|caps| {
            let date = self.layout.date_from(&caps)?;
            Some(DateMatch {
                date,
                raw: trim_match(caps.get(0)?.as_str()),
            })
        })
    }
}

/// Month and day from the display text combined with a year from the href.
#[derive(Debug, Clone, Default)]
pub struct MonthDayWithHrefYear;

impl DateStrategy for MonthDayWithHrefYear {
    fn name(&self) -> &'static str {
        "display_month_day_href_year"
    }

    fn attempt(&self, record: &LinkRecord) -> Option<DateMatch> {
        let caps = MONTH_DAY.captures(&record.display_text)?;
        let month = month_number(caps.get(1)?.as_str())?;
        let day = caps.get(2)?.as_str().parse::<u32>().ok()?;

        let href = Field::Href.read(record);
        LONE_YEAR.captures_iter(&href).find_map(|year_caps| {
            let year = year_caps.get(1)?.as_str();
            let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month, day)?;
            Some(DateMatch {
                date,
                raw: format!("{} {}", trim_match(caps.get(0)?.as_str()), year),
            })
        })
    }
}

/// The built-in strategies in resolution order: display text first, then the
/// href, then the partial display date completed from the href.
pub fn default_strategies() -> Vec<Box<dyn DateStrategy>> {
    vec![
        Box::new(PatternStrategy::new(
            "display_month_name",
            Field::DisplayText,
            DateLayout::MonthNameDayYear,
        )),
        Box::new(PatternStrategy::new(
            "display_day_month_name",
            Field::DisplayText,
            DateLayout::DayMonthNameYear,
        )),
        Box::new(PatternStrategy::new(
            "display_numeric",
            Field::DisplayText,
            DateLayout::NumericMonthDayYear,
        )),
        Box::new(PatternStrategy::new(
            "display_iso",
            Field::DisplayText,
            DateLayout::IsoYearMonthDay,
        )),
        Box::new(PatternStrategy::new(
            "href_numeric",
            Field::Href,
            DateLayout::NumericMonthDayYear,
        )),
        Box::new(PatternStrategy::new(
            "href_iso",
            Field::Href,
            DateLayout::IsoYearMonthDay,
        )),
        Box::new(PatternStrategy::new(
            "href_month_name",
            Field::Href,
            DateLayout::LooseMonthNameDayYear,
        )),
        Box::new(PatternStrategy::new(
            "href_path_segments",
            Field::Href,
            DateLayout::PathYearMonthDay,
        )),
        Box::new(PatternStrategy::new(
            "href_compact",
            Field::Href,
            DateLayout::CompactYearMonthDay,
        )),
        Box::new(MonthDayWithHrefYear),
    ]
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Two-digit years are read as 20xx.
fn parse_year(text: &str) -> Option<i32> {
    let year = text.parse::<i32>().ok()?;
    Some(if text.len() <= 2 { year + 2000 } else { year })
}

fn trim_match(text: &str) -> String {
    text.trim_matches(|c: char| !c.is_alphanumeric()).to_string()
}
