use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NA;

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

/// Column names shared by the extractor layouts, the merger and the renderer.
pub mod fields {
    pub const SN: &str = "SN";
    pub const SYMBOL: &str = "Symbol";
    pub const LTP: &str = "LTP";
    pub const CHANGE_PCT: &str = "Change%";
    pub const DAY_HIGH: &str = "Day High";
    pub const DAY_LOW: &str = "Day Low";
    pub const VOLUME: &str = "Volume";
    pub const PREV_CLOSE: &str = "Previous Close";
    pub const TURNOVER: &str = "Turnover";
    pub const WEEK52_HIGH: &str = "52 Week High";
    pub const WEEK52_LOW: &str = "52 Week Low";
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One scraped table row. Untyped: every value is the cell text, or `N/A`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field value, or the sentinel when the field is absent.
    pub fn get_or_na(&self, name: &str) -> &str {
        self.get(name).unwrap_or(NA)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Numeric view of a field. `None` for missing, sentinel or malformed values.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(parse_number)
    }

    /// The join key. `None` when missing or the sentinel.
    pub fn symbol(&self) -> Option<&str> {
        self.get(fields::SYMBOL).filter(|s| !is_sentinel(s))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// MergedRecord
// ---------------------------------------------------------------------------

/// A live row joined with its 52-week row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    #[serde(flatten)]
    pub record: Record,
    /// `(high - ltp) / high * 100`
    pub pct_below_high: Option<f64>,
    /// `(ltp - low) / low * 100`
    pub pct_above_low: Option<f64>,
}

impl MergedRecord {
    pub fn symbol(&self) -> Option<&str> {
        self.record.symbol()
    }
}

// ---------------------------------------------------------------------------
// Market summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryItem {
    pub label: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Last known-good pipeline output, kept in memory for stale periods.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub records: Vec<MergedRecord>,
    pub summary: Vec<SummaryItem>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn find(&self, symbol: &str) -> Option<&MergedRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.symbol().is_some_and(|s| s.eq_ignore_ascii_case(symbol)))
    }
}

/// Where the records of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Live,
    Snapshot,
    Empty,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataSource::Live => "live",
            DataSource::Snapshot => "snapshot",
            DataSource::Empty => "empty",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

pub fn is_sentinel(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == NA || v == "-" || v == "--"
}

/// Parse a scraped number: `"1,234.50"`, `"-2.5%"`, `" 7 "`.
/// Returns `None` for sentinels, non-numeric text and non-finite values.
pub fn parse_number(value: &str) -> Option<f64> {
    if is_sentinel(value) {
        return None;
    }
    let cleaned: String = value
        .chars()
        .filter(|c| *c != ',' && *c != '%' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}
