use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::Surface;
use crate::foundation::core::ClockTime;
use crate::foundation::error::DemuxResult;

/// One decoded video frame, premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes, `width * height * 4`.
    pub data: Vec<u8>,
    /// Stream timestamp.
    pub pts: Option<ClockTime>,
}

#[derive(Default)]
struct TargetInner {
    frame: Option<Arc<VideoFrame>>,
    generation: u64,
}

/// Latest frame of an embedded video, read by the document when it paints.
///
/// Written from a provider's decode thread, so it has its own lock and never touches the
/// document lock.
#[derive(Default)]
pub struct BlendTarget {
    inner: Mutex<TargetInner>,
}

impl BlendTarget {
    /// Target with no frame.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the current frame.
    pub fn show(&self, frame: VideoFrame) {
        let mut inner = self.lock();
        inner.frame = Some(Arc::new(frame));
        inner.generation = inner.generation.wrapping_add(1);
    }

    /// Most recent frame, if any.
    pub fn latest(&self) -> Option<Arc<VideoFrame>> {
        self.lock().frame.clone()
    }

    /// Bumped on every new frame. Lets readers detect change without comparing pixels.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Drop the current frame. The generation is kept.
    pub fn clear(&self) {
        self.lock().frame = None;
    }

    /// The current frame as a surface, `None` when there is none.
    pub fn to_surface(&self) -> Option<DemuxResult<Surface>> {
        let frame = self.latest()?;
        Some(Surface::from_premul_rgba8(
            frame.width,
            frame.height,
            frame.data.clone(),
        ))
    }

    fn lock(&self) -> MutexGuard<'_, TargetInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/target.rs"]
mod tests;
