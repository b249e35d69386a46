//! Playback segment: the window of the output timeline being produced.

use crate::foundation::core::ClockTime;
use crate::host::SeekRequest;

/// Playback window on the output timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Playback rate.
    pub rate: f64,
    /// First timestamp of the window.
    pub start: ClockTime,
    /// Requested end of the window.
    pub stop: Option<ClockTime>,
    /// Timestamp of the next frame.
    pub position: ClockTime,
    /// Length of the document timeline, when known.
    pub duration: Option<ClockTime>,
}

impl Default for Segment {
    fn default() -> Self {
        Self {
            rate: 1.0,
            start: ClockTime::ZERO,
            stop: None,
            position: ClockTime::ZERO,
            duration: None,
        }
    }
}

impl Segment {
    /// The earlier of `stop` and `duration`.
    pub fn effective_stop(&self) -> Option<ClockTime> {
        match (self.stop, self.duration) {
            (Some(s), Some(d)) => Some(s.min(d)),
            (s, d) => s.or(d),
        }
    }

    /// Whether the position reached the effective stop.
    pub fn is_finished(&self) -> bool {
        self.effective_stop().is_some_and(|stop| self.position >= stop)
    }

    /// Move the position forward, never past the effective stop.
    pub fn advance(&mut self, by: ClockTime) {
        let next = self.position + by;
        self.position = match self.effective_stop() {
            Some(stop) => next.min(stop.max(self.position)),
            None => next,
        };
    }

    /// Segment requested by `seek`. Unset bounds keep the current values.
    pub fn from_seek(&self, seek: &SeekRequest) -> Segment {
        let start = seek.start.unwrap_or(self.start);
        Segment {
            rate: seek.rate,
            start,
            stop: seek.stop.or(self.stop),
            position: start,
            duration: self.duration,
        }
    }

    /// Fit `pending` inside this segment's timeline. The result starts playing at its start.
    pub fn clip(&self, pending: &Segment) -> Segment {
        let mut out = *pending;
        out.duration = self.duration;
        if let Some(d) = self.duration {
            out.start = out.start.min(d);
            out.stop = out.stop.map(|s| s.min(d));
        }
        if let Some(stop) = out.stop {
            out.start = out.start.min(stop);
        }
        if !out.rate.is_finite() || out.rate == 0.0 {
            out.rate = 1.0;
        }
        out.position = out.start;
        out
    }

    /// Whether start, stop and rate all match `other`.
    pub fn same_bounds(&self, other: &Segment) -> bool {
        self.start == other.start && self.stop == other.stop && self.rate == other.rate
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scheduler/segment.rs"]
mod tests;
