//! In-memory host endpoints for tests and debugging.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::foundation::core::ClockTime;
use crate::host::caps::{VideoCaps, VideoFormat};
use crate::host::pool::VideoBuffer;
use crate::host::port::{DownstreamEvent, DynamicPort, FlowError, PortHost, VideoOutput};

/// A frame as seen by [`MemoryOutput`].
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedFrame {
    /// Presentation timestamp.
    pub pts: Option<ClockTime>,
    /// Frame duration.
    pub duration: Option<ClockTime>,
    /// BGRx pixels.
    pub data: Vec<u8>,
}

/// Everything the output saw, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputItem {
    /// A serialized event.
    Event(DownstreamEvent),
    /// A pushed buffer.
    Frame(RecordedFrame),
}

#[derive(Default)]
struct MemoryInner {
    items: Vec<OutputItem>,
    frames: usize,
    peer_caps: Option<VideoCaps>,
    fail_after: Option<(usize, FlowError)>,
}

/// Video output that records frames and events.
#[derive(Default)]
pub struct MemoryOutput {
    inner: Mutex<MemoryInner>,
    cond: Condvar,
}

impl MemoryOutput {
    /// Empty recorder accepting any format.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Constrain the formats this output accepts.
    pub fn set_peer_caps(&self, caps: Option<VideoCaps>) {
        self.lock().peer_caps = caps;
    }

    /// Accept `n` frames, then fail every push with `err`.
    pub fn fail_after(&self, n: usize, err: FlowError) {
        self.lock().fail_after = Some((n, err));
    }

    /// Everything recorded so far.
    pub fn items(&self) -> Vec<OutputItem> {
        self.lock().items.clone()
    }

    /// Recorded frames, events skipped.
    pub fn frames(&self) -> Vec<RecordedFrame> {
        self.lock()
            .items
            .iter()
            .filter_map(|i| match i {
                OutputItem::Frame(f) => Some(f.clone()),
                OutputItem::Event(_) => None,
            })
            .collect()
    }

    /// Recorded events, frames skipped.
    pub fn events(&self) -> Vec<DownstreamEvent> {
        self.lock()
            .items
            .iter()
            .filter_map(|i| match i {
                OutputItem::Event(e) => Some(e.clone()),
                OutputItem::Frame(_) => None,
            })
            .collect()
    }

    /// Number of frames accepted.
    pub fn frame_count(&self) -> usize {
        self.lock().frames
    }

    /// Whether end of stream arrived.
    pub fn saw_eos(&self) -> bool {
        self.lock()
            .items
            .iter()
            .any(|i| matches!(i, OutputItem::Event(DownstreamEvent::Eos)))
    }

    /// Block until end of stream or `timeout`. Returns whether it arrived.
    pub fn wait_for_eos(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |inner| {
            inner
                .items
                .iter()
                .any(|i| matches!(i, OutputItem::Event(DownstreamEvent::Eos)))
        })
    }

    /// Block until `n` frames were accepted or `timeout`. Returns whether they were.
    pub fn wait_for_frames(&self, n: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |inner| inner.frames >= n)
    }

    fn wait_until(&self, timeout: Duration, mut done: impl FnMut(&MemoryInner) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            if done(&inner) {
                return true;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return false;
            }
            inner = match self.cond.wait_timeout(inner, left) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VideoOutput for MemoryOutput {
    fn peer_caps(&self) -> Option<VideoCaps> {
        self.lock().peer_caps
    }

    fn accept_format(&self, format: &VideoFormat) -> bool {
        match self.lock().peer_caps {
            Some(caps) => caps.intersect(&format.to_caps()).is_some(),
            None => true,
        }
    }

    fn push(&self, buffer: VideoBuffer) -> Result<(), FlowError> {
        let mut inner = self.lock();
        if let Some((n, err)) = inner.fail_after
            && inner.frames >= n
        {
            return Err(err);
        }
        inner.frames += 1;
        inner.items.push(OutputItem::Frame(RecordedFrame {
            pts: buffer.pts,
            duration: buffer.duration,
            data: buffer.to_vec(),
        }));
        drop(inner);
        self.cond.notify_all();
        Ok(())
    }

    fn push_event(&self, event: DownstreamEvent) -> bool {
        self.lock().items.push(OutputItem::Event(event));
        self.cond.notify_all();
        true
    }
}

/// Port host that keeps track of exposed dynamic ports.
#[derive(Default)]
pub struct MemoryPortHost {
    ports: Mutex<Vec<Arc<DynamicPort>>>,
    finished: Mutex<Vec<String>>,
}

impl MemoryPortHost {
    /// Host with no ports.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Ports currently exposed.
    pub fn ports(&self) -> Vec<Arc<DynamicPort>> {
        self.ports.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The exposed port called `name`.
    pub fn port(&self, name: &str) -> Option<Arc<DynamicPort>> {
        self.ports()
            .into_iter()
            .find(|p| p.name() == name)
    }

    /// Providers that signalled they have no more streams.
    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl PortHost for MemoryPortHost {
    fn port_added(&self, port: Arc<DynamicPort>) {
        self.ports.lock().unwrap_or_else(|e| e.into_inner()).push(port);
    }

    fn port_removed(&self, name: &str) {
        self.ports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|p| p.name() != name);
    }

    fn no_more_ports(&self, provider: &str) {
        self.finished
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(provider.to_owned());
    }
}
