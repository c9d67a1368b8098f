//! Integration tests for the log store
//!
//! Each test opens its own database under a temporary directory.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use sqlite_logger::store::{RetentionPolicy, StoreError};
use sqlite_logger::{DeleteRange, LogLevel, LogQuery, LogStore, PendingEntry, SortOrder};
use tempfile::TempDir;

const DB_NAME: &str = "test.sqlite";

fn policy(save_threshold: usize) -> RetentionPolicy {
    RetentionPolicy {
        save_threshold,
        save_interval: Duration::ZERO,
        max_age: Duration::ZERO,
        delete_interval: Duration::ZERO,
        delete_on_every_save: false,
    }
}

fn create_test_store(save_threshold: usize) -> (LogStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = LogStore::open_with_policy(temp_dir.path(), DB_NAME, policy(save_threshold)).unwrap();
    (store, temp_dir)
}

fn info(message: impl Into<String>) -> PendingEntry {
    PendingEntry::new(LogLevel::Info, "test", message)
}

fn ids(store: &LogStore) -> Vec<i64> {
    store
        .get_logs(&LogQuery::new())
        .unwrap()
        .iter()
        .map(|e| e.id)
        .collect()
}

fn fill(store: &LogStore, count: usize) {
    for i in 0..count {
        store.append(info(format!("entry {}", i))).unwrap();
    }
    store.flush().unwrap();
}

#[test]
fn test_threshold_flush_assigns_gapless_ids() {
    let (store, _temp) = create_test_store(10);

    for i in 0..25 {
        store.append(info(i.to_string())).unwrap();
    }

    let stats = store.stats().unwrap();
    assert_eq!(stats.persisted, 20);
    assert_eq!(stats.pending, 5);
    assert_eq!(ids(&store), (1..=20).collect::<Vec<_>>());

    let messages: Vec<String> = store
        .get_logs(&LogQuery::new())
        .unwrap()
        .into_iter()
        .map(|e| e.message)
        .collect();
    let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
    assert_eq!(messages, expected);
}

#[test]
fn test_round_trip_preserves_fields() {
    let (store, _temp) = create_test_store(100);
    let ts = Utc.timestamp_millis_opt(1_700_000_123_456).unwrap();

    store
        .append(PendingEntry::at(ts, LogLevel::Warning, "disk", "97% full"))
        .unwrap();
    store.flush().unwrap();

    let logs = store.get_logs(&LogQuery::new()).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].id, 1);
    assert_eq!(logs[0].timestamp, ts);
    assert_eq!(logs[0].level, LogLevel::Warning);
    assert_eq!(logs[0].tag, "disk");
    assert_eq!(logs[0].message, "97% full");
}

#[test]
fn test_struct_literal_entry_round_trips() {
    let (store, _temp) = create_test_store(100);
    let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();

    store
        .append(PendingEntry {
            timestamp: precise,
            level: LogLevel::Debug,
            tag: "raw".to_string(),
            message: "built by hand".to_string(),
        })
        .unwrap();
    store.flush().unwrap();

    let logs = store.get_logs(&LogQuery::new()).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].timestamp, Utc.timestamp_millis_opt(1_700_000_000_123).unwrap());
    assert_eq!(logs[0].timestamp.timestamp_subsec_nanos(), 123_000_000);
}

#[test]
fn test_close_is_idempotent_and_persists_buffer() {
    let temp_dir = TempDir::new().unwrap();
    let store = LogStore::open_with_policy(temp_dir.path(), DB_NAME, policy(100)).unwrap();
    store.append(info("a")).unwrap();
    store.append(info("b")).unwrap();

    store.close().unwrap();
    store.close().unwrap();
    assert!(matches!(store.flush(), Err(StoreError::Closed)));
    drop(store);

    let store = LogStore::open(temp_dir.path(), DB_NAME).unwrap();
    assert_eq!(ids(&store), vec![1, 2]);
}

#[test]
fn test_delete_range_exact_and_idempotent() {
    let (store, _temp) = create_test_store(100);
    fill(&store, 20);

    assert!(store.delete_logs(Some(5), Some(10), Some(100)).unwrap());

    let expected: Vec<i64> = (1..=4).chain(11..=20).collect();
    assert_eq!(ids(&store), expected);

    let again = store
        .delete_range(DeleteRange::new(Some(5), Some(10), Some(100)))
        .unwrap();
    assert_eq!(again, Some(0));
    assert_eq!(ids(&store), expected);
}

#[test]
fn test_delete_never_touches_later_flushes() {
    let (store, _temp) = create_test_store(100);
    fill(&store, 5);

    store.append(info("still buffered")).unwrap();
    assert!(store.delete_logs(None, None, Some(1_000)).unwrap());
    store.flush().unwrap();

    let logs = store.get_logs(&LogQuery::new()).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].id, 6);
    assert_eq!(logs[0].message, "still buffered");
}

#[test]
fn test_inverted_ranges() {
    let (store, _temp) = create_test_store(100);
    fill(&store, 5);

    assert!(!store.delete_logs(Some(4), Some(2), None).unwrap());
    assert_eq!(ids(&store).len(), 5);
    assert!(store
        .get_logs(&LogQuery::new().range(Some(4), Some(2)))
        .unwrap()
        .is_empty());
}

#[test]
fn test_min_and_explicit_level() {
    let (store, _temp) = create_test_store(100);
    for level in [
        LogLevel::Verbose,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
    ] {
        store.append(PendingEntry::new(level, "lvl", level.as_str())).unwrap();
    }
    store.flush().unwrap();

    let at_least_info: Vec<LogLevel> = store
        .get_logs(&LogQuery::new().min_level(LogLevel::Info))
        .unwrap()
        .iter()
        .map(|e| e.level)
        .collect();
    assert_eq!(
        at_least_info,
        vec![LogLevel::Info, LogLevel::Warning, LogLevel::Error]
    );

    let only_info = store
        .get_logs(&LogQuery::new().exact_level(LogLevel::Info))
        .unwrap();
    assert_eq!(only_info.len(), 1);
    assert_eq!(only_info[0].level, LogLevel::Info);
}

#[test]
fn test_query_combines_filters() {
    let (store, _temp) = create_test_store(100);
    for i in 0..10 {
        let tag = if i % 2 == 0 { "even" } else { "odd" };
        store
            .append(PendingEntry::new(LogLevel::Info, tag, i.to_string()))
            .unwrap();
    }
    store.flush().unwrap();

    let logs = store
        .get_logs(
            &LogQuery::new()
                .range(Some(2), None)
                .tags(["even"])
                .order(SortOrder::Desc)
                .limit(3),
        )
        .unwrap();
    let found: Vec<i64> = logs.iter().map(|e| e.id).collect();
    assert_eq!(found, vec![9, 7, 5]);
    assert!(logs.iter().all(|e| e.tag == "even"));
}

#[test]
fn test_concurrent_appends_lose_nothing() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 250;

    let (store, _temp) = create_test_store(64);
    let store = Arc::new(store);

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    store.append(info(format!("{}-{}", t, i))).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    store.flush().unwrap();

    let logs = store.get_logs(&LogQuery::new()).unwrap();
    assert_eq!(logs.len(), THREADS * PER_THREAD);

    let unique_ids: HashSet<i64> = logs.iter().map(|e| e.id).collect();
    assert_eq!(unique_ids.len(), THREADS * PER_THREAD);
    let unique_messages: HashSet<&str> = logs.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(unique_messages.len(), THREADS * PER_THREAD);

    let expected: Vec<i64> = (1..=(THREADS * PER_THREAD) as i64).collect();
    assert_eq!(logs.iter().map(|e| e.id).collect::<Vec<_>>(), expected);
}

#[test]
fn test_uncommitted_transaction_leaves_prior_state() {
    let temp_dir = TempDir::new().unwrap();
    let path = {
        let store = LogStore::open_with_policy(temp_dir.path(), DB_NAME, policy(100)).unwrap();
        fill(&store, 3);
        store.db_file_path().to_path_buf()
    };

    {
        let mut conn = Connection::open(&path).unwrap();
        let tx = conn.transaction().unwrap();
        tx.execute(
            "INSERT INTO logs (timestamp, level, tag, message) VALUES (0, 30, 'x', 'half-written')",
            [],
        )
        .unwrap();
        // Dropped without commit
    }

    let store = LogStore::open(temp_dir.path(), DB_NAME).unwrap();
    assert_eq!(ids(&store), vec![1, 2, 3]);
    assert_eq!(store.stats().unwrap().last_id, 3);
}

#[test]
fn test_crash_loses_only_buffered_entries() {
    let temp_dir = TempDir::new().unwrap();
    let store = LogStore::open_with_policy(temp_dir.path(), DB_NAME, policy(100)).unwrap();
    fill(&store, 2);
    store.append(info("never flushed")).unwrap();

    // Skip Drop, as a killed process would
    std::mem::forget(store);

    let store = LogStore::open(temp_dir.path(), DB_NAME).unwrap();
    let logs = store.get_logs(&LogQuery::new()).unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|e| e.message != "never flushed"));
}

#[test]
fn test_failed_flush_keeps_buffer_for_retry() {
    let (store, _temp) = create_test_store(100);
    let saboteur = Connection::open(store.db_file_path()).unwrap();
    saboteur
        .execute_batch(
            "CREATE TRIGGER poison BEFORE INSERT ON logs
             WHEN NEW.message = 'poison'
             BEGIN SELECT RAISE(ABORT, 'poisoned'); END;",
        )
        .unwrap();

    store.append(info("before")).unwrap();
    store.append(info("poison")).unwrap();
    store.append(info("after")).unwrap();

    let err = store.flush().unwrap_err();
    assert!(matches!(err, StoreError::Transaction(_)));
    assert!(err.is_retryable());

    let stats = store.stats().unwrap();
    assert_eq!(stats.persisted, 0);
    assert_eq!(stats.pending, 3);
    assert_eq!(store.metrics().flush_failures, 1);

    saboteur.execute_batch("DROP TRIGGER poison;").unwrap();
    assert_eq!(store.flush().unwrap(), 3);
    assert_eq!(ids(&store), vec![1, 2, 3]);
}

#[test]
fn test_reopen_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = LogStore::open(temp_dir.path(), DB_NAME).unwrap();
        store.append(info("persisted")).unwrap();
        store.close().unwrap();
    }

    for _ in 0..3 {
        let store = LogStore::open(temp_dir.path(), DB_NAME).unwrap();
        let logs = store.get_logs(&LogQuery::new()).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "persisted");
        assert_eq!(store.stats().unwrap().last_id, 1);
    }
}

#[test]
fn test_age_purge_respects_max_age() {
    let (store, _temp) = create_test_store(100);
    store.set_max_age(Duration::from_secs(24 * 60 * 60));

    let now = Utc::now();
    store
        .append(PendingEntry::at(now - chrono::Duration::days(3), LogLevel::Info, "t", "old"))
        .unwrap();
    store
        .append(PendingEntry::at(now - chrono::Duration::hours(1), LogLevel::Info, "t", "recent"))
        .unwrap();
    store.flush().unwrap();

    assert_eq!(store.purge_expired().unwrap(), 1);
    let logs = store.get_logs(&LogQuery::new()).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].message, "recent");
}

#[test]
fn test_damaged_database_reports_query_error() {
    let (store, _temp) = create_test_store(100);
    fill(&store, 3);

    let vandal = Connection::open(store.db_file_path()).unwrap();
    vandal.execute_batch("DROP TABLE logs;").unwrap();

    assert!(matches!(store.get_logs(&LogQuery::new()), Err(StoreError::Query(_))));
    assert!(matches!(store.stats(), Err(StoreError::Query(_))));
    assert!(matches!(
        store.delete_logs(Some(1), Some(2), None),
        Err(StoreError::Query(_))
    ));
    assert!(store.is_open());
}
