use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A live short link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub keyword: String,
    pub url: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub ip: String,
    pub clicks: u64,
}

/// Aggregate link statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkStats {
    pub total_links: u64,
    pub total_clicks: u64,
}

/// How a click counter update is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickUpdate {
    /// Overwrite with an absolute value.
    Absolute(u64),
    /// Server-side `clicks = clicks + 1`.
    Increment,
}

/// Columns `keywords_for_url` may sort by. Anything outside this set never
/// reaches the query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
    Keyword,
    Title,
    CreatedAt,
    Clicks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// A stored option value.
///
/// Scalars are persisted as plain text; composites as JSON. The tag is
/// explicit so (de)serialization is a total, testable function rather than a
/// string-sniffing heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Scalar(String),
    Composite(serde_json::Value),
}

impl OptionValue {
    pub fn scalar<T: Into<String>>(value: T) -> Self {
        OptionValue::Scalar(value.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Scalar(s) => Some(s),
            OptionValue::Composite(_) => None,
        }
    }

    /// Parse a scalar as an unsigned integer, `None` for composites and
    /// non-numeric scalars.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_str().and_then(|s| s.trim().parse().ok())
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Scalar(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Scalar(value)
    }
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        OptionValue::Scalar(value.to_string())
    }
}

impl From<serde_json::Value> for OptionValue {
    fn from(value: serde_json::Value) -> Self {
        OptionValue::Composite(value)
    }
}
