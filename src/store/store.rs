use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{DeleteRange, LogEntry, LogLevel, LogQuery, PendingEntry};
use crate::observability::{Metrics, MetricsSnapshot};

use super::error::{Result, StoreError};
use super::pruning::{RetentionPolicy, delete_older_than};
use super::schema::{
    COUNT_ENTRIES, CREATE_SCHEMA, INSERT_ENTRY, LAST_ASSIGNED_ID, delete_range_sql, row_to_entry,
    select_sql,
};

/// File name used when the caller passes an empty one
pub const DEFAULT_FILE_NAME: &str = "log.sqlite";

/// SQLite-backed log store with an in-memory pending buffer
///
/// All state sits behind one mutex: appends, flushes, deletions and reads
/// never interleave. Share it as `Arc<LogStore>`.
pub struct LogStore {
    path: PathBuf,
    inner: Mutex<Inner>,
    metrics: Metrics,
}

struct Inner {
    conn: Option<Connection>,
    pending: Vec<PendingEntry>,
    policy: RetentionPolicy,
    last_flush: Instant,
    last_purge: Option<Instant>,
    /// Highest id ever committed, read from `sqlite_sequence` on open
    last_id: i64,
}

impl LogStore {
    /// Open or create `directory/file_name` with the default retention policy
    pub fn open(directory: impl AsRef<Path>, file_name: &str) -> Result<Self> {
        Self::open_with_policy(directory, file_name, RetentionPolicy::default())
    }

    /// Open or create `directory/file_name`, creating the directory if needed
    pub fn open_with_policy(
        directory: impl AsRef<Path>,
        file_name: &str,
        policy: RetentionPolicy,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        let file_name = if file_name.trim().is_empty() {
            DEFAULT_FILE_NAME
        } else {
            file_name
        };

        std::fs::create_dir_all(directory).map_err(|e| StoreError::init(directory, e))?;
        let directory = directory
            .canonicalize()
            .map_err(|e| StoreError::init(directory, e))?;
        let path = directory.join(file_name);
        info!(path = %path.display(), "Opening log store");

        let conn = Connection::open(&path).map_err(|e| StoreError::init(&path, e))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .and_then(|_| conn.execute_batch(CREATE_SCHEMA))
            .map_err(|e| StoreError::init(&path, e))?;

        let last_id: i64 = conn
            .query_row(LAST_ASSIGNED_ID, [], |row| row.get(0))
            .optional()
            .map_err(|e| StoreError::init(&path, e))?
            .unwrap_or(0);

        info!(path = %path.display(), last_id, "Log store opened");
        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                conn: Some(conn),
                pending: Vec::new(),
                policy,
                last_flush: Instant::now(),
                last_purge: None,
                last_id,
            }),
            metrics: Metrics::new(),
        })
    }

    /// Open the store described by `config.storage` with `config.retention`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open_with_policy(
            &config.storage.log_file_dir,
            &config.storage.log_file_name,
            RetentionPolicy::from(&config.retention),
        )
    }

    /// Absolute path of the database file
    pub fn db_file_path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().conn.is_some()
    }

    /// Buffer an entry, flushing when the threshold or interval is reached
    ///
    /// Entries with [`LogLevel::Unknown`] are discarded. If the triggered
    /// flush fails, its error is returned and the entry stays buffered.
    pub fn append(&self, entry: PendingEntry) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.conn.is_none() {
            return Err(StoreError::Closed);
        }

        if entry.level == LogLevel::Unknown {
            self.metrics.entry_dropped();
            return Ok(());
        }

        inner.pending.push(entry.normalized());
        self.metrics.entry_appended();

        if inner
            .policy
            .flush_due(inner.pending.len(), inner.last_flush, Instant::now())
        {
            self.flush_locked(&mut inner)?;
        }
        Ok(())
    }

    /// Persist every buffered entry in one transaction
    ///
    /// Returns the number of entries made durable.
    pub fn flush(&self) -> Result<usize> {
        let mut inner = self.inner.lock();
        self.flush_locked(&mut inner)
    }

    /// Flush only if the save threshold or save interval has been reached
    pub fn flush_if_due(&self) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.conn.is_none() {
            return Err(StoreError::Closed);
        }
        if !inner
            .policy
            .flush_due(inner.pending.len(), inner.last_flush, Instant::now())
        {
            return Ok(0);
        }
        self.flush_locked(&mut inner)
    }

    fn flush_locked(&self, inner: &mut Inner) -> Result<usize> {
        let conn = inner.conn.as_mut().ok_or(StoreError::Closed)?;

        if inner.pending.is_empty() {
            inner.last_flush = Instant::now();
            return Ok(0);
        }

        let last_id = match write_batch(conn, &inner.pending) {
            Ok(id) => id,
            Err(e) => {
                self.metrics.flush_failed();
                warn!(pending = inner.pending.len(), error = %e, "Flush rolled back, entries kept for retry");
                return Err(StoreError::Transaction(e));
            }
        };

        let count = inner.pending.len();
        inner.pending.clear();
        inner.last_flush = Instant::now();
        inner.last_id = last_id;
        self.metrics.flushed(count);
        debug!(count, last_id, "Flushed log entries");

        if inner.policy.delete_on_every_save {
            if let Err(e) = self.purge_locked(inner, Utc::now()) {
                warn!(error = %e, "Purge after flush failed");
            }
        }

        Ok(count)
    }

    /// Delete entries with `start <= id <= end`, never above `max_id`
    ///
    /// `None` bounds are open. Returns `false` without touching anything if
    /// `start > end` or the store is closed.
    pub fn delete_logs(
        &self,
        start: Option<i64>,
        end: Option<i64>,
        max_id: Option<i64>,
    ) -> Result<bool> {
        Ok(self
            .delete_range(DeleteRange::new(start, end, max_id))?
            .is_some())
    }

    /// Like [`delete_logs`](Self::delete_logs) but reports the number of
    /// rows removed; `None` means the request was rejected.
    pub fn delete_range(&self, range: DeleteRange) -> Result<Option<usize>> {
        if !range.is_valid() {
            debug!(?range, "Rejected delete with start > end");
            return Ok(None);
        }

        let mut inner = self.inner.lock();
        let ceiling = inner.last_id;
        let Some(conn) = inner.conn.as_mut() else {
            return Ok(None);
        };

        let (sql, args) = delete_range_sql(&range, ceiling);
        let tx = conn.transaction()?;
        let deleted = tx.execute(&sql, params_from_iter(args))?;
        tx.commit()?;

        self.metrics.deleted(deleted);
        debug!(?range, deleted, "Deleted log entries");
        Ok(Some(deleted))
    }

    /// Delete entries stamped before `cutoff`, never above `max_id` or the
    /// last flushed id
    pub fn delete_older_than(&self, cutoff: DateTime<Utc>, max_id: Option<i64>) -> Result<usize> {
        let inner = self.inner.lock();
        let conn = inner.conn.as_ref().ok_or(StoreError::Closed)?;
        let ceiling = max_id.map_or(inner.last_id, |m| m.min(inner.last_id));
        let deleted = delete_older_than(conn, cutoff, ceiling)?;
        self.metrics.deleted(deleted);
        Ok(deleted)
    }

    /// Delete entries older than `max_age`. No-op when `max_age` is zero.
    pub fn purge_expired(&self) -> Result<usize> {
        let mut inner = self.inner.lock();
        self.purge_locked(&mut inner, Utc::now())
    }

    /// Run [`purge_expired`](Self::purge_expired) if `delete_interval` has
    /// elapsed since the previous purge
    pub fn purge_if_due(&self) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.conn.is_none() {
            return Err(StoreError::Closed);
        }
        if !inner.policy.purge_due(inner.last_purge, Instant::now()) {
            return Ok(0);
        }
        self.purge_locked(&mut inner, Utc::now())
    }

    fn purge_locked(&self, inner: &mut Inner, now: DateTime<Utc>) -> Result<usize> {
        let conn = inner.conn.as_ref().ok_or(StoreError::Closed)?;
        let Some(cutoff) = inner.policy.cutoff(now) else {
            return Ok(0);
        };

        let deleted = delete_older_than(conn, cutoff, inner.last_id)?;
        inner.last_purge = Some(Instant::now());
        self.metrics.purged(deleted);
        Ok(deleted)
    }

    /// Read durable entries matching `query`
    pub fn get_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        let inner = self.inner.lock();
        let conn = inner.conn.as_ref().ok_or(StoreError::Closed)?;

        if query.is_empty_range() {
            return Ok(Vec::new());
        }

        let (sql, args) = select_sql(query);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Rebuild the database file to reclaim space left by deletions
    pub fn vacuum(&self) -> Result<()> {
        let inner = self.inner.lock();
        let conn = inner.conn.as_ref().ok_or(StoreError::Closed)?;
        conn.execute_batch("VACUUM;")?;
        info!(path = %self.path.display(), "Vacuumed log store");
        Ok(())
    }

    /// Flush pending entries and release the database handle
    ///
    /// Calling it again is a no-op. If the final flush fails the store stays
    /// open and the error is returned.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.conn.is_none() {
            return Ok(());
        }

        self.flush_locked(&mut inner)?;

        if let Some(conn) = inner.conn.take() {
            if let Err((conn, e)) = conn.close() {
                inner.conn = Some(conn);
                return Err(StoreError::Query(e));
            }
        }

        info!(path = %self.path.display(), "Log store closed");
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let inner = self.inner.lock();
        let conn = inner.conn.as_ref().ok_or(StoreError::Closed)?;
        let persisted: i64 = conn.query_row(COUNT_ENTRIES, [], |row| row.get(0))?;

        Ok(StoreStats {
            persisted: usize::try_from(persisted).unwrap_or_default(),
            pending: inner.pending.len(),
            last_id: inner.last_id,
        })
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.inner.lock().policy
    }

    pub fn set_retention(&self, policy: RetentionPolicy) {
        self.inner.lock().policy = policy;
    }

    pub fn save_threshold(&self) -> usize {
        self.inner.lock().policy.save_threshold
    }

    pub fn set_save_threshold(&self, threshold: usize) {
        self.inner.lock().policy.save_threshold = threshold;
    }

    pub fn save_interval(&self) -> Duration {
        self.inner.lock().policy.save_interval
    }

    pub fn set_save_interval(&self, interval: Duration) {
        self.inner.lock().policy.save_interval = interval;
    }

    pub fn max_age(&self) -> Duration {
        self.inner.lock().policy.max_age
    }

    pub fn set_max_age(&self, max_age: Duration) {
        self.inner.lock().policy.max_age = max_age;
    }

    pub fn delete_interval(&self) -> Duration {
        self.inner.lock().policy.delete_interval
    }

    pub fn set_delete_interval(&self, interval: Duration) {
        self.inner.lock().policy.delete_interval = interval;
    }

    pub fn delete_on_every_save(&self) -> bool {
        self.inner.lock().policy.delete_on_every_save
    }

    pub fn set_delete_on_every_save(&self, enabled: bool) {
        self.inner.lock().policy.delete_on_every_save = enabled;
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "Log store dropped with unflushed entries");
        }
    }
}

/// Insert `entries` in order inside one transaction, returning the last id.
/// Dropping the transaction on error rolls it back.
fn write_batch(conn: &mut Connection, entries: &[PendingEntry]) -> rusqlite::Result<i64> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(INSERT_ENTRY)?;
        for entry in entries {
            stmt.execute(params![
                entry.timestamp.timestamp_millis(),
                entry.level.code(),
                entry.tag,
                entry.message,
            ])?;
        }
    }
    let last_id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(last_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub persisted: usize,
    pub pending: usize,
    pub last_id: i64,
}
