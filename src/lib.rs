//! Bounded, SQLite-backed log retention.
//!
//! Entries are buffered in memory, flushed to a single SQLite table in one
//! transaction, and pruned by age or id range. [`layer::SqliteLayer`] feeds
//! the store from `tracing`; [`maintenance::spawn`] drives time-based
//! flushes and purges.

pub mod config;
pub mod humanize;
pub mod layer;
pub mod maintenance;
pub mod models;
pub mod observability;
pub mod sink;
pub mod store;

pub use layer::SqliteLayer;
pub use models::{DeleteRange, LogEntry, LogLevel, LogQuery, PendingEntry, SortOrder};
pub use sink::LogSink;
pub use store::{LogStore, RetentionPolicy, StoreError};
