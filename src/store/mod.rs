/// SQLite-backed persistence for buffered log entries
///
/// Entries are appended to an in-memory buffer and written to the `logs`
/// table in one transaction when the buffer reaches `save_threshold` or when
/// `save_interval` has elapsed. Nothing is readable until it has been
/// flushed.
///
/// ## Retention
///
/// - Age: entries older than `max_age` are purged every `delete_interval`,
///   or after every flush when `delete_on_every_save` is set
/// - Range: `delete_logs(start, end, max_id)` removes an id range
///
/// Deletions never reach above the highest flushed id.
///
/// ## Usage
///
/// ```rust,ignore
/// use sqlite_logger::models::{LogLevel, LogQuery, PendingEntry};
/// use sqlite_logger::store::LogStore;
///
/// let store = LogStore::open("logs", "log.sqlite")?;
/// store.append(PendingEntry::new(LogLevel::Info, "net", "connected"))?;
/// store.flush()?;
/// let entries = store.get_logs(&LogQuery::new().min_level(LogLevel::Info))?;
/// ```

pub mod error;
pub mod pruning;
pub mod schema;
pub mod store;

pub use error::{InitCause, Result, StoreError};
pub use pruning::{
    DEFAULT_DELETE_INTERVAL, DEFAULT_MAX_AGE, DEFAULT_SAVE_INTERVAL, DEFAULT_SAVE_THRESHOLD,
    RetentionPolicy,
};
pub use store::{DEFAULT_FILE_NAME, LogStore, StoreStats};
