//! Store counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics handle for recording store activity
#[derive(Debug, Default)]
pub struct Metrics {
    entries_appended: AtomicU64,
    entries_dropped: AtomicU64,
    entries_flushed: AtomicU64,
    flush_failures: AtomicU64,
    entries_deleted: AtomicU64,
    purges: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_appended(&self) {
        self.entries_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn entry_dropped(&self) {
        self.entries_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn flushed(&self, count: usize) {
        self.entries_flushed.fetch_add(count as u64, Ordering::Relaxed);
        tracing::trace!(counter = "entries_flushed", count, "Metric incremented");
    }

    pub fn flush_failed(&self) {
        self.flush_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = "flush_failures", "Metric incremented");
    }

    pub fn deleted(&self, count: usize) {
        self.entries_deleted.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn purged(&self, count: usize) {
        self.purges.fetch_add(1, Ordering::Relaxed);
        self.deleted(count);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            entries_appended: self.entries_appended.load(Ordering::Relaxed),
            entries_dropped: self.entries_dropped.load(Ordering::Relaxed),
            entries_flushed: self.entries_flushed.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            entries_deleted: self.entries_deleted.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub entries_appended: u64,
    pub entries_dropped: u64,
    pub entries_flushed: u64,
    pub flush_failures: u64,
    pub entries_deleted: u64,
    pub purges: u64,
}
