use std::sync::{Arc, Mutex, Weak};

use crate::foundation::core::ClockTime;
use crate::host::FlowError;

/// Sizing of a [`BufferPool`].
#[derive(Clone, Copy, Debug)]
pub struct BufferPoolOpts {
    /// Bytes per buffer.
    pub buffer_size: usize,
    /// Maximum number of idle buffers kept for reuse.
    pub max_retained: usize,
}

impl BufferPoolOpts {
    /// Options for `buffer_size` byte buffers, retaining up to four.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            max_retained: 4,
        }
    }
}

/// Allocation counters of a [`BufferPool`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Idle buffers held for reuse.
    pub retained_buffers: usize,
    /// Buffers allocated fresh.
    pub alloc_buffers: u64,
    /// Acquisitions served from retained buffers.
    pub reused_buffers: u64,
    /// Released buffers freed because the pool was full or inactive.
    pub dropped_on_release: u64,
}

struct PoolInner {
    active: bool,
    free: Vec<Vec<u8>>,
    stats: BufferPoolStats,
}

/// Bounded pool of equally sized frame buffers.
///
/// Buffers return to the pool when the last [`VideoBuffer`] handle drops. An inactive pool refuses
/// acquisition with [`FlowError::Flushing`].
pub struct BufferPool {
    opts: BufferPoolOpts,
    inner: Mutex<PoolInner>,
}

impl BufferPool {
    /// An active, empty pool.
    pub fn new(opts: BufferPoolOpts) -> Arc<Self> {
        Arc::new(Self {
            opts,
            inner: Mutex::new(PoolInner {
                active: true,
                free: Vec::new(),
                stats: BufferPoolStats::default(),
            }),
        })
    }

    /// Bytes per buffer.
    pub fn buffer_size(&self) -> usize {
        self.opts.buffer_size
    }

    /// Current counters.
    pub fn stats(&self) -> BufferPoolStats {
        self.lock().stats.clone()
    }

    /// Whether acquisition is allowed.
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Deactivating drops every retained buffer.
    pub fn set_active(&self, active: bool) {
        let mut inner = self.lock();
        inner.active = active;
        if !active {
            inner.free.clear();
            inner.stats.retained_buffers = 0;
        }
    }

    /// Take a buffer, reusing a retained one when possible.
    pub fn acquire(self: &Arc<Self>) -> Result<VideoBuffer, FlowError> {
        let mut inner = self.lock();
        if !inner.active {
            return Err(FlowError::Flushing);
        }
        let data = match inner.free.pop() {
            Some(buf) => {
                inner.stats.retained_buffers = inner.stats.retained_buffers.saturating_sub(1);
                inner.stats.reused_buffers = inner.stats.reused_buffers.saturating_add(1);
                buf
            }
            None => {
                inner.stats.alloc_buffers = inner.stats.alloc_buffers.saturating_add(1);
                vec![0u8; self.opts.buffer_size]
            }
        };
        Ok(VideoBuffer {
            data,
            pts: None,
            duration: None,
            pool: Arc::downgrade(self),
        })
    }

    fn release(&self, data: Vec<u8>) {
        let mut inner = self.lock();
        if !inner.active
            || data.len() != self.opts.buffer_size
            || inner.free.len() >= self.opts.max_retained
        {
            inner.stats.dropped_on_release = inner.stats.dropped_on_release.saturating_add(1);
            return;
        }
        inner.free.push(data);
        inner.stats.retained_buffers = inner.free.len();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// One output frame. Memory goes back to its pool on drop.
pub struct VideoBuffer {
    data: Vec<u8>,
    /// Presentation timestamp.
    pub pts: Option<ClockTime>,
    /// Frame duration.
    pub duration: Option<ClockTime>,
    pool: Weak<BufferPool>,
}

impl VideoBuffer {
    /// Buffer not attached to any pool.
    pub fn detached(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
            pts: None,
            duration: None,
            pool: Weak::new(),
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Frame bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Frame bytes, mutable.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Copy the frame bytes out, leaving the pooled memory to be recycled.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.clone()
    }
}

impl std::fmt::Debug for VideoBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoBuffer")
            .field("len", &self.data.len())
            .field("pts", &self.pts)
            .field("duration", &self.duration)
            .finish()
    }
}

impl Drop for VideoBuffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.upgrade() {
            pool.release(std::mem::take(&mut self.data));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/pool.rs"]
mod tests;
