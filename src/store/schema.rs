/// Table layout and SQL construction for the log database
///
/// Single table:
/// - `logs`: id (AUTOINCREMENT, never reused) | timestamp (epoch ms) | level (code) | tag | message
///
/// AUTOINCREMENT keeps the high-water mark in `sqlite_sequence`, so ids stay
/// monotonic across deletions and restarts.
use chrono::DateTime;
use rusqlite::Row;
use rusqlite::types::Value;

use crate::models::{DeleteRange, LogEntry, LogLevel, LogQuery};

pub const TABLE_LOGS: &str = "logs";

pub const CREATE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp INTEGER NOT NULL,
        level INTEGER NOT NULL,
        tag TEXT NOT NULL DEFAULT '',
        message TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS i_logs_timestamp ON logs (timestamp);
    CREATE INDEX IF NOT EXISTS i_logs_tag ON logs (tag);";

pub const INSERT_ENTRY: &str =
    "INSERT INTO logs (timestamp, level, tag, message) VALUES (?1, ?2, ?3, ?4)";

pub const SELECT_ENTRIES: &str = "SELECT id, timestamp, level, tag, message FROM logs";

pub const COUNT_ENTRIES: &str = "SELECT COUNT(*) FROM logs";

pub const LAST_ASSIGNED_ID: &str = "SELECT seq FROM sqlite_sequence WHERE name = 'logs'";

/// WHERE-clause accumulator with positional arguments.
#[derive(Debug, Default)]
pub struct Filter {
    clauses: Vec<String>,
    args: Vec<Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `clause` must contain exactly one `?`.
    pub fn push(&mut self, clause: &str, value: impl Into<Value>) {
        self.clauses.push(clause.to_string());
        self.args.push(value.into());
    }

    pub fn push_in(&mut self, column: &str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses.push(format!("{} IN ({})", column, placeholders));
        self.args
            .extend(values.iter().map(|v| Value::Text(v.clone())));
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn into_args(self) -> Vec<Value> {
        self.args
    }
}

/// Build the SELECT for a query. Returns SQL and its arguments.
pub fn select_sql(query: &LogQuery) -> (String, Vec<Value>) {
    let mut filter = Filter::new();

    if let Some(start) = query.start {
        filter.push("id >= ?", start);
    }
    if let Some(end) = query.end {
        filter.push("id <= ?", end);
    }
    if let Some(level) = query.level {
        let clause = if query.explicit_level { "level = ?" } else { "level >= ?" };
        filter.push(clause, i64::from(level.code()));
    }
    filter.push_in("tag", &query.tags);

    let mut sql = format!(
        "{}{} ORDER BY id {}",
        SELECT_ENTRIES,
        filter.where_sql(),
        query.order.as_sql()
    );

    let mut args = filter.into_args();
    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        sql.push_str(" LIMIT ?");
        args.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    (sql, args)
}

/// Build an id-range DELETE. `id_ceiling` is the highest flushed id.
pub fn delete_range_sql(range: &DeleteRange, id_ceiling: i64) -> (String, Vec<Value>) {
    let mut filter = Filter::new();

    if let Some(start) = range.start {
        filter.push("id >= ?", start);
    }
    if let Some(end) = range.end {
        filter.push("id <= ?", end);
    }
    let max_id = range.max_id.map_or(id_ceiling, |m| m.min(id_ceiling));
    filter.push("id <= ?", max_id);

    (format!("DELETE FROM {}{}", TABLE_LOGS, filter.where_sql()), filter.into_args())
}

/// Build a timestamp-driven DELETE for rows strictly older than `cutoff_ms`.
pub fn delete_older_than_sql(cutoff_ms: i64, max_id: i64) -> (String, Vec<Value>) {
    let mut filter = Filter::new();
    filter.push("timestamp < ?", cutoff_ms);
    filter.push("id <= ?", max_id);

    (format!("DELETE FROM {}{}", TABLE_LOGS, filter.where_sql()), filter.into_args())
}

/// Map a row selected with [`SELECT_ENTRIES`] column order.
pub fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    let millis: i64 = row.get(1)?;
    let timestamp = DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(1, millis))?;

    Ok(LogEntry {
        id: row.get(0)?,
        timestamp,
        level: LogLevel::from_code(row.get(2)?),
        tag: row.get(3)?,
        message: row.get(4)?,
    })
}
