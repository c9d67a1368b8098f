/// Retention policy and age-based purge decisions
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params_from_iter};
use tracing::debug;

use super::schema::delete_older_than_sql;

/// Defaults for a freshly opened store
pub const DEFAULT_SAVE_THRESHOLD: usize = 500;
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 24 * 60 * 60);
pub const DEFAULT_DELETE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Flush and purge thresholds.
///
/// Zero durations disable the corresponding trigger. A `save_threshold`
/// of zero flushes on every append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub save_threshold: usize,
    pub save_interval: Duration,
    pub max_age: Duration,
    pub delete_interval: Duration,
    pub delete_on_every_save: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            save_threshold: DEFAULT_SAVE_THRESHOLD,
            save_interval: DEFAULT_SAVE_INTERVAL,
            max_age: DEFAULT_MAX_AGE,
            delete_interval: DEFAULT_DELETE_INTERVAL,
            delete_on_every_save: false,
        }
    }
}

impl RetentionPolicy {
    /// Whether a buffer of `pending` entries, last flushed at `last_flush`,
    /// must be flushed now.
    pub fn flush_due(&self, pending: usize, last_flush: Instant, now: Instant) -> bool {
        if pending == 0 {
            return false;
        }
        if pending >= self.save_threshold {
            return true;
        }
        !self.save_interval.is_zero() && now.duration_since(last_flush) >= self.save_interval
    }

    /// Whether the scheduled purge should run, given when it last ran.
    pub fn purge_due(&self, last_purge: Option<Instant>, now: Instant) -> bool {
        if self.max_age.is_zero() || self.delete_interval.is_zero() {
            return false;
        }
        match last_purge {
            None => true,
            Some(at) => now.duration_since(at) >= self.delete_interval,
        }
    }

    /// Entries stamped before this instant are expired.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.max_age.is_zero() {
            return None;
        }
        let age = chrono::Duration::from_std(self.max_age).ok()?;
        now.checked_sub_signed(age)
    }

    /// How often a scheduler should wake to check the triggers.
    pub fn tick_period(&self) -> Duration {
        [self.save_interval, self.delete_interval]
            .into_iter()
            .filter(|d| !d.is_zero())
            .min()
            .unwrap_or(Duration::from_secs(1))
    }
}

/// Delete rows older than `cutoff` with id at most `max_id`
pub fn delete_older_than(
    conn: &Connection,
    cutoff: DateTime<Utc>,
    max_id: i64,
) -> rusqlite::Result<usize> {
    let (sql, args) = delete_older_than_sql(cutoff.timestamp_millis(), max_id);
    let deleted = conn.execute(&sql, params_from_iter(args))?;
    debug!(deleted, cutoff = %cutoff, max_id, "Deleted expired log entries");
    Ok(deleted)
}
