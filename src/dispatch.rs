//! Control dispatcher: moves provider bus messages off the threads that post them.
//!
//! Decode chains post from their streaming threads, where touching provider state would risk
//! deadlock. Messages are queued here and handled on one dedicated thread for the lifetime of a
//! document.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::foundation::error::{DemuxError, DemuxResult};
use crate::media::ProviderId;

/// Provider bus messages handled on the dispatcher thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlMessage {
    /// A provider's decode chain failed.
    Error {
        /// Failing provider.
        provider: ProviderId,
        /// Chain-supplied description.
        reason: String,
    },
    /// A provider began an asynchronous state change.
    AsyncStart {
        /// Posting provider.
        provider: ProviderId,
    },
    /// A provider finished an asynchronous state change.
    AsyncDone {
        /// Posting provider.
        provider: ProviderId,
    },
    /// Ends the dispatcher thread. Messages queued behind it are discarded.
    Shutdown,
}

/// Consumer of dispatched messages.
pub trait ControlHandler: Send + Sync {
    /// Handle one message. Runs on the dispatcher thread.
    fn handle(&self, msg: ControlMessage);
}

/// Non-blocking producer end of the dispatcher queue.
#[derive(Clone)]
pub struct DispatchSender {
    tx: mpsc::Sender<ControlMessage>,
}

impl DispatchSender {
    /// Queue `msg`. Dropped silently once the dispatcher is gone.
    pub fn send(&self, msg: ControlMessage) {
        if self.tx.send(msg).is_err() {
            tracing::trace!("dispatcher queue closed, message dropped");
        }
    }
}

/// Owns the queue and the thread that drains it.
///
/// The receiver outlives any single worker thread, so senders handed out before a stop or a
/// handler panic keep feeding the same queue after a restart.
pub struct Dispatcher {
    tx: mpsc::Sender<ControlMessage>,
    rx: Arc<Mutex<mpsc::Receiver<ControlMessage>>>,
    worker: Option<JoinHandle<()>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a stopped dispatcher with an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            worker: None,
        }
    }

    /// A producer handle for the queue. Valid across stops and restarts.
    pub fn sender(&self) -> DispatchSender {
        DispatchSender {
            tx: self.tx.clone(),
        }
    }

    /// Whether a worker thread is attached.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the worker thread. A no-op while one is already running.
    pub fn start(&mut self, handler: Arc<dyn ControlHandler>) -> DemuxResult<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let rx = self.rx.clone();
        let worker = std::thread::Builder::new()
            .name("demux-dispatch".to_owned())
            .spawn(move || {
                tracing::debug!("dispatcher started");
                let rx = lock(&rx);
                while let Ok(msg) = rx.recv() {
                    if msg == ControlMessage::Shutdown {
                        break;
                    }
                    handler.handle(msg);
                }
                tracing::debug!("dispatcher stopped");
            })
            .map_err(|e| DemuxError::Other(anyhow::Error::new(e).context("spawn dispatcher")))?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Stop the thread, wait for it, and discard whatever is still queued.
    ///
    /// Returns the number of discarded messages.
    pub fn stop(&mut self) -> usize {
        if let Some(worker) = self.worker.take() {
            self.sender().send(ControlMessage::Shutdown);
            if worker.join().is_err() {
                tracing::error!("dispatcher thread panicked");
            }
        }
        // A panicked worker leaves our own shutdown request queued.
        let discarded = lock(&self.rx)
            .try_iter()
            .filter(|msg| *msg != ControlMessage::Shutdown)
            .count();
        if discarded > 0 {
            tracing::debug!(discarded, "dispatcher queue drained");
        }
        discarded
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "../tests/unit/dispatch.rs"]
mod tests;
