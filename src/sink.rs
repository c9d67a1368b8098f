use crate::models::PendingEntry;
use crate::store::{LogStore, Result, RetentionPolicy};

/// Destination for captured log entries
///
/// The tracing layer and the maintenance task only see this trait, so any
/// store shared as `Arc<dyn LogSink>` can back them.
pub trait LogSink: Send + Sync {
    /// Buffer one entry. May flush if a trigger is reached.
    fn write(&self, entry: PendingEntry) -> Result<()>;

    /// Persist everything buffered so far
    fn flush(&self) -> Result<usize>;

    /// Flush only if the size or time trigger has fired
    fn flush_if_due(&self) -> Result<usize>;

    /// Purge expired entries only if the purge interval has elapsed
    fn purge_if_due(&self) -> Result<usize>;

    fn retention(&self) -> RetentionPolicy;

    fn set_retention(&self, policy: RetentionPolicy);
}

impl LogSink for LogStore {
    fn write(&self, entry: PendingEntry) -> Result<()> {
        self.append(entry)
    }

    fn flush(&self) -> Result<usize> {
        LogStore::flush(self)
    }

    fn flush_if_due(&self) -> Result<usize> {
        LogStore::flush_if_due(self)
    }

    fn purge_if_due(&self) -> Result<usize> {
        LogStore::purge_if_due(self)
    }

    fn retention(&self) -> RetentionPolicy {
        LogStore::retention(self)
    }

    fn set_retention(&self, policy: RetentionPolicy) {
        LogStore::set_retention(self, policy)
    }
}
