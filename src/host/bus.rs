use std::sync::Mutex;
use std::sync::mpsc;
use std::time::Duration;

use crate::foundation::core::{ClockTime, State};

/// Out-of-band notifications posted to the host application.
#[derive(Clone, Debug, PartialEq)]
pub enum HostMessage {
    /// Fatal failure. The element stops producing.
    Error {
        /// Posting element.
        source: String,
        /// Human-readable cause.
        reason: String,
    },
    /// Recoverable failure, such as an embedded video error.
    Warning {
        /// Posting element.
        source: String,
        /// Human-readable cause.
        reason: String,
    },
    /// The stream duration is now known, or no longer known.
    DurationChanged {
        /// New duration, `None` when unbounded.
        duration: Option<ClockTime>,
    },
    /// The element started an asynchronous state change.
    AsyncStart {
        /// Posting element.
        source: String,
    },
    /// The element completed an asynchronous state change.
    AsyncDone {
        /// Posting element.
        source: String,
    },
    /// The element changed state.
    StateChanged {
        /// Posting element.
        source: String,
        /// State before the change.
        old: State,
        /// State after the change.
        new: State,
    },
    /// The output reached end of stream.
    Eos {
        /// Posting element.
        source: String,
    },
}

/// Message sink owned by the host.
pub trait HostBus: Send + Sync {
    /// Deliver `msg`. Must not block.
    fn post(&self, msg: HostMessage);
}

/// Bus backed by an in-process channel. Useful for embedding and tests.
pub struct ChannelBus {
    tx: mpsc::Sender<HostMessage>,
    rx: Mutex<mpsc::Receiver<HostMessage>>,
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Next message, if one is queued.
    pub fn try_pop(&self) -> Option<HostMessage> {
        self.rx.lock().ok()?.try_recv().ok()
    }

    /// Next message, waiting at most `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<HostMessage> {
        self.rx.lock().ok()?.recv_timeout(timeout).ok()
    }

    /// Wait until a message matching `pred` arrives, discarding the others.
    pub fn wait_for(
        &self,
        timeout: Duration,
        mut pred: impl FnMut(&HostMessage) -> bool,
    ) -> Option<HostMessage> {
        let deadline = std::time::Instant::now() + timeout;
        let rx = self.rx.lock().ok()?;
        loop {
            let left = deadline.saturating_duration_since(std::time::Instant::now());
            let msg = rx.recv_timeout(left).ok()?;
            if pred(&msg) {
                return Some(msg);
            }
        }
    }

    /// Take every queued message.
    pub fn drain(&self) -> Vec<HostMessage> {
        let Ok(rx) = self.rx.lock() else {
            return Vec::new();
        };
        rx.try_iter().collect()
    }
}

impl HostBus for ChannelBus {
    fn post(&self, msg: HostMessage) {
        // Receiver lives as long as `self`.
        let _ = self.tx.send(msg);
    }
}
