//! `tracing` integration
//!
//! [`SqliteLayer`] turns every event seen by a subscriber into a
//! [`PendingEntry`] and hands it to a [`LogSink`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlite_logger::{layer::SqliteLayer, store::LogStore};
//! use tracing_subscriber::prelude::*;
//!
//! let store = Arc::new(LogStore::open("logs", "log.sqlite")?);
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(SqliteLayer::new(store.clone()))
//!     .init();
//!
//! tracing::info!(tag = "net", peer = 7, "connected");
//! ```

use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::config::CaptureConfig;
use crate::models::{LogLevel, PendingEntry};
use crate::sink::LogSink;

/// Events from this crate are never captured: the store logs while holding
/// its own lock.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

const TAG_FIELD: &str = "tag";
const MESSAGE_FIELD: &str = "message";

pub struct SqliteLayer {
    sink: Arc<dyn LogSink>,
    min_level: LogLevel,
    errors: Arc<AtomicU64>,
}

impl SqliteLayer {
    /// Capture `Debug` and above into `sink`
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            min_level: LogLevel::Debug,
            errors: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Capture into `sink` at the level set by `[capture] min_level`
    pub fn from_config(sink: Arc<dyn LogSink>, config: &CaptureConfig) -> Self {
        Self::new(sink).with_min_level(config.min_level)
    }

    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Counter of entries the sink refused. Stays valid after the layer is
    /// moved into a subscriber.
    pub fn error_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.errors)
    }

    fn captures(&self, target: &str, level: LogLevel) -> bool {
        !is_own_target(target) && level.code() >= self.min_level.code()
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl<S: Subscriber> Layer<S> for SqliteLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = LogLevel::from(metadata.level());
        if !self.captures(metadata.target(), level) {
            return;
        }

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let tag = visitor
            .tag
            .take()
            .unwrap_or_else(|| metadata.target().to_string());
        let entry = PendingEntry::new(level, tag, visitor.into_message());

        if self.sink.write(entry).is_err() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[derive(Default)]
struct EntryVisitor {
    message: String,
    tag: Option<String>,
    fields: String,
}

impl EntryVisitor {
    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        // `log.*` fields are added by tracing-log bridging
        if name.starts_with("log.") {
            return;
        }
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }

    fn into_message(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl Visit for EntryVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            MESSAGE_FIELD => self.message = value.to_string(),
            TAG_FIELD => self.tag = Some(value.to_string()),
            name => self.push_field(name, format_args!("{}", value)),
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            MESSAGE_FIELD => self.message = format!("{:?}", value),
            TAG_FIELD => self.tag = Some(format!("{:?}", value)),
            name => self.push_field(name, format_args!("{:?}", value)),
        }
    }
}
