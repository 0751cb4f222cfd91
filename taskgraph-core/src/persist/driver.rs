//! Tokio driver for [`PositionPersistence`].
//!
//! Each staged drag spawns a timer task that sleeps until the debounce
//! deadline; a newer drag aborts the previous timer and spawns its own, so
//! only the last one in a quiet window fires. The fired timer takes the due
//! batches and writes them on a detached task. Nothing on the interactive
//! path awaits a write, and failed writes are logged and dropped.

use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use super::debounce::{DragStop, PositionPersistence};
use super::store::{PositionRecord, PositionStore};

/// Owns the debounce timer of one view instance.
pub struct FlushDriver {
    persistence: Arc<Mutex<PositionPersistence>>,
    store: Arc<dyn PositionStore>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl FlushDriver {
    /// Create a driver writing to `store`. No timer runs until the first drag.
    pub fn new(persistence: PositionPersistence, store: Arc<dyn PositionStore>) -> Self {
        Self {
            persistence: Arc::new(Mutex::new(persistence)),
            store,
            timer: Mutex::new(None),
        }
    }

    /// Store the driver writes to.
    pub fn store(&self) -> &Arc<dyn PositionStore> {
        &self.store
    }

    /// Workspace staged records are written to.
    pub fn workspace_id(&self) -> String {
        self.persistence.lock().workspace_id().to_owned()
    }

    /// Number of distinct nodes staged.
    pub fn pending_len(&self) -> usize {
        self.persistence.lock().pending_len()
    }

    /// Stage a drag-stop and (re)arm the timer.
    ///
    /// Outside a tokio runtime the update stays staged until [`flush_now`]
    /// or the next drag made inside one.
    ///
    /// [`flush_now`]: FlushDriver::flush_now
    pub fn stage(&self, stop: DragStop) {
        let deadline = self.persistence.lock().record(stop, Instant::now());

        let Ok(handle) = Handle::try_current() else {
            debug!("no runtime, position update left staged");
            return;
        };

        let persistence = Arc::clone(&self.persistence);
        let store = Arc::clone(&self.store);
        let timer = handle.spawn(async move {
            time::sleep_until(deadline).await;
            let due = persistence.lock().take_due(Instant::now());
            if let Some(batches) = due {
                tokio::spawn(write_batches(store, batches));
            }
        });

        if let Some(previous) = self.timer.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Write everything staged right away, without waiting for the deadline.
    pub fn flush_now(&self) {
        self.abort_timer();
        let batches = self.persistence.lock().take_all();
        if batches.is_empty() {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(write_batches(Arc::clone(&self.store), batches));
            }
            Err(_) => warn!(
                batches = batches.len(),
                "no runtime to write positions, dropping them"
            ),
        }
    }

    /// Drop staged updates and retarget at another workspace.
    pub fn reset(&self, workspace_id: &str) {
        self.abort_timer();
        self.persistence.lock().reset(workspace_id);
    }

    fn abort_timer(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}

impl Drop for FlushDriver {
    fn drop(&mut self) {
        self.flush_now();
    }
}

impl std::fmt::Debug for FlushDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushDriver")
            .field("persistence", &*self.persistence.lock())
            .field("armed", &self.timer.lock().is_some())
            .finish()
    }
}

/// Write every batch concurrently, logging failures.
async fn write_batches(store: Arc<dyn PositionStore>, batches: Vec<Vec<PositionRecord>>) {
    let writes = batches.iter().map(|batch| store.upsert(batch));
    for (index, result) in join_all(writes).await.into_iter().enumerate() {
        match result {
            Ok(()) => debug!(batch = index, records = batches[index].len(), "positions flushed"),
            Err(err) => warn!(batch = index, error = %err, "position flush failed"),
        }
    }
}
