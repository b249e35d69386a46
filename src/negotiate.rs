//! Output format negotiation.

use std::sync::Arc;

use crate::engine::{SizeHint, WindowFeature};
use crate::foundation::core::Fraction;
use crate::foundation::error::{DemuxError, DemuxResult};
use crate::host::{BufferPool, BufferPoolOpts, Range, VideoCaps, VideoFormat, VideoOutput};
use crate::settings::DemuxSettings;

/// Frame rate picked when downstream leaves it open.
pub const DEFAULT_FRAMERATE: Fraction = Fraction::whole(30);

/// Caps the demuxer can produce given the document's window, plus the size fixation should aim
/// for.
pub fn query_caps(window: Option<&dyn WindowFeature>) -> (VideoCaps, Option<(u32, u32)>) {
    let mut caps = VideoCaps::template();
    let Some(window) = window else {
        return (caps, None);
    };
    let hint = window.size_hint();
    match hint {
        SizeHint::Unknown => (caps, None),
        SizeHint::Fixed { width, height } => {
            caps.width = Range::fixed(width.max(1));
            caps.height = Range::fixed(height.max(1));
            (caps, Some((width.max(1), height.max(1))))
        }
        SizeHint::Range {
            min_width,
            min_height,
            max_width,
            max_height,
        } => {
            let w = Range::new(min_width.max(1), max_width.max(1));
            let h = Range::new(min_height.max(1), max_height.max(1));
            match (caps.width.intersect(&w), caps.height.intersect(&h)) {
                (Some(w), Some(h)) => {
                    caps.width = w;
                    caps.height = h;
                }
                _ => tracing::warn!(?hint, "ignoring unusable window size range"),
            }
            (caps, None)
        }
        SizeHint::Preferred { width, height } => {
            let preferred = (width > 0 && height > 0).then_some((width, height));
            (caps, preferred)
        }
    }
}

/// Outcome of a successful negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Negotiation {
    /// Agreed format.
    pub format: VideoFormat,
    /// Frame geometry differs from the previous format.
    pub resized: bool,
    /// Any field differs from the previous format.
    pub changed: bool,
}

/// Holds the current output format and its buffer pool.
#[derive(Default)]
pub struct CapsNegotiator {
    format: Option<VideoFormat>,
    pool: Option<Arc<BufferPool>>,
}

impl CapsNegotiator {
    /// No format agreed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current format.
    pub fn format(&self) -> Option<&VideoFormat> {
        self.format.as_ref()
    }

    /// Pool serving the current format.
    pub fn pool(&self) -> Option<&Arc<BufferPool>> {
        self.pool.as_ref()
    }

    /// Agree on a format with `output` and make sure a matching pool is active.
    pub fn negotiate(
        &mut self,
        window: Option<&dyn WindowFeature>,
        output: &dyn VideoOutput,
        settings: &DemuxSettings,
    ) -> DemuxResult<Negotiation> {
        let (ours, preferred) = query_caps(window);
        let caps = match output.peer_caps() {
            Some(peer) => ours
                .intersect(&peer)
                .ok_or_else(|| DemuxError::negotiation("no common format with downstream"))?,
            None => ours,
        };
        let (tw, th) = preferred.unwrap_or((settings.width, settings.height));
        let format = caps.fixate(tw, th, DEFAULT_FRAMERATE);
        if !output.accept_format(&format) {
            return Err(DemuxError::negotiation(format!(
                "downstream rejected {}x{}@{}",
                format.width, format.height, format.framerate
            )));
        }

        let changed = self.format != Some(format);
        let resized = self.format.is_none_or(|old| !old.same_size(&format));
        if resized && let Some(window) = window {
            window.set_content_size(format.width, format.height);
        }

        let pool_fits = self
            .pool
            .as_ref()
            .is_some_and(|p| p.is_active() && p.buffer_size() == format.buffer_size());
        if !pool_fits {
            if let Some(old) = self.pool.take() {
                old.set_active(false);
            }
            let pool = output
                .propose_pool(&format)
                .filter(|p| p.buffer_size() == format.buffer_size())
                .unwrap_or_else(|| BufferPool::new(BufferPoolOpts::new(format.buffer_size())));
            pool.set_active(true);
            self.pool = Some(pool);
        }

        if changed {
            tracing::info!(
                width = format.width,
                height = format.height,
                framerate = %format.framerate,
                "output format negotiated"
            );
        }
        self.format = Some(format);
        Ok(Negotiation {
            format,
            resized,
            changed,
        })
    }

    /// Forget the format and deactivate the pool.
    pub fn reset(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.set_active(false);
        }
        self.format = None;
    }
}

#[cfg(test)]
#[path = "../tests/unit/negotiate.rs"]
mod tests;
