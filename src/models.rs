//! Log entry models shared by the store, the tracing layer and callers.
//!
//! - [`PendingEntry`] is what callers hand to the store; it has no id yet
//! - [`LogEntry`] is a persisted row, id assigned by the database on flush
//! - [`LogQuery`] and [`DeleteRange`] describe range reads and deletions
//!
//! Timestamps are kept at millisecond precision because that is what the
//! database column stores; constructors normalise them so an entry reads
//! back exactly as it was written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log entry, persisted as its integer code.
///
/// Deserializes through [`FromStr`], so aliases such as `"warn"` and
/// `"trace"` are accepted wherever a level is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Unknown,
    Verbose,
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Unknown,
        LogLevel::Verbose,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
    ];

    pub fn code(self) -> i32 {
        match self {
            LogLevel::Unknown => -1,
            LogLevel::Verbose => 10,
            LogLevel::Debug => 20,
            LogLevel::Info => 30,
            LogLevel::Warning => 40,
            LogLevel::Error => 50,
        }
    }

    /// Unrecognised codes map to `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            10 => LogLevel::Verbose,
            20 => LogLevel::Debug,
            30 => LogLevel::Info,
            40 => LogLevel::Warning,
            50 => LogLevel::Error,
            _ => LogLevel::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Unknown => "unknown",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => LogLevel::Verbose,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warning,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level '{}'", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for LogLevel {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" | "trace" => Ok(LogLevel::Verbose),
            "debug" => Ok(LogLevel::Debug),
            "info" | "log" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "unknown" => Ok(LogLevel::Unknown),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Result ordering by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses `"asc"`/`"desc"` case-insensitively; anything else, including
    /// `None`, is ascending.
    pub fn parse_or_default(order: Option<&str>) -> Self {
        match order.map(|o| o.trim().to_ascii_lowercase()) {
            Some(o) if o == "desc" => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// `null`, a missing field or an unrecognised string all mean ascending.
fn lenient_order<'de, D>(deserializer: D) -> Result<SortOrder, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let order = Option::<String>::deserialize(deserializer)?;
    Ok(SortOrder::parse_or_default(order.as_deref()))
}

fn truncate_to_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}

/// An entry accepted by the store but not yet flushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
}

impl PendingEntry {
    /// Drop sub-millisecond precision the database column cannot hold.
    pub(crate) fn normalized(mut self) -> Self {
        self.timestamp = truncate_to_millis(self.timestamp);
        self
    }

    /// Entry stamped with the current time.
    pub fn new(level: LogLevel, tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::at(Utc::now(), level, tag, message)
    }

    pub fn at(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        tag: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: truncate_to_millis(timestamp),
            level,
            tag: tag.into(),
            message: message.into(),
        }
    }
}

/// A durable row read back from the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
}

/// Filters for [`LogStore::get_logs`](crate::store::LogStore::get_logs).
///
/// `start`/`end` are inclusive id bounds. `level` is a minimum severity
/// unless `explicit_level` is set, in which case it must match exactly.
/// An empty `tags` list does not filter; a `limit` of `None` or `Some(0)`
/// does not cap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub limit: Option<usize>,
    #[serde(default, deserialize_with = "lenient_order")]
    pub order: SortOrder,
    #[serde(default)]
    pub explicit_level: bool,
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self.explicit_level = false;
        self
    }

    pub fn exact_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self.explicit_level = true;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// True when both bounds are set and `start > end`.
    pub fn is_empty_range(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

/// Id bounds for [`LogStore::delete_logs`](crate::store::LogStore::delete_logs).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub max_id: Option<i64>,
}

impl DeleteRange {
    pub fn new(start: Option<i64>, end: Option<i64>, max_id: Option<i64>) -> Self {
        Self { start, end, max_id }
    }

    pub fn is_valid(&self) -> bool {
        !matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}
