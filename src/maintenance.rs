//! Background flush and purge scheduling
//!
//! The store never spawns anything itself. [`spawn`] starts a tokio task that
//! wakes every [`RetentionPolicy::tick_period`](crate::store::RetentionPolicy::tick_period),
//! then runs `flush_if_due` and `purge_if_due` on the blocking pool. The
//! policy is re-read on each tick so setter changes apply without a restart.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::sink::LogSink;
use crate::store::{Result, StoreError};

pub struct MaintenanceHandle {
    sink: Arc<dyn LogSink>,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

/// Start periodic maintenance for `sink`. Must be called inside a tokio runtime.
pub fn spawn(sink: Arc<dyn LogSink>) -> MaintenanceHandle {
    let (stop, stopped) = watch::channel(false);
    let task = tokio::spawn(run(Arc::clone(&sink), stopped));

    MaintenanceHandle {
        sink,
        stop,
        task: Some(task),
    }
}

impl MaintenanceHandle {
    /// Stop the loop and flush whatever is still buffered
    ///
    /// Returns the number of entries written by the final flush.
    pub async fn shutdown(mut self) -> Result<usize> {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Log maintenance task ended abnormally");
            }
        }

        match self.sink.flush() {
            Err(StoreError::Closed) => Ok(0),
            other => other,
        }
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
    }
}

async fn run(sink: Arc<dyn LogSink>, mut stopped: watch::Receiver<bool>) {
    info!("Log maintenance started");

    loop {
        let period = sink.retention().tick_period();
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = stopped.changed() => break,
        }

        let worker = Arc::clone(&sink);
        match tokio::task::spawn_blocking(move || tick(worker.as_ref())).await {
            Ok(Ok(())) => {}
            Ok(Err(StoreError::Closed)) => {
                debug!("Log store closed, stopping maintenance");
                break;
            }
            Ok(Err(e)) => warn!(error = %e, "Log maintenance tick failed"),
            Err(e) => warn!(error = %e, "Log maintenance tick panicked"),
        }
    }

    info!("Log maintenance stopped");
}

fn tick(sink: &dyn LogSink) -> Result<()> {
    let flushed = sink.flush_if_due()?;
    let purged = sink.purge_if_due()?;
    if flushed > 0 || purged > 0 {
        debug!(flushed, purged, "Log maintenance tick");
    }
    Ok(())
}
