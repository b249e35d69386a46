//! Frame-rate adaptation from downstream QoS reports.

/// Ceiling for rates raised by QoS: one frame per millisecond.
pub const MAX_FPS: u32 = 1000;

/// New frame rate after downstream reported `proportion`.
///
/// Above 1 downstream is too slow and the rate drops to `fps / proportion`. Below 1 there is
/// headroom and the rate grows by `(1 - proportion) * fps`, up to [`MAX_FPS`]. A rate already
/// above the ceiling is never raised further. Never below 1.
pub fn adapt_fps(fps: u32, proportion: f64) -> u32 {
    let fps = fps.max(1);
    if !proportion.is_finite() || proportion <= 0.0 {
        return fps;
    }
    let mut num = f64::from(fps);
    let mut den = 1.0;
    if proportion > 1.0 {
        den *= proportion;
    } else {
        num += (1.0 - proportion) * num;
    }
    let next = (num / den).floor().min(f64::from(MAX_FPS.max(fps)));
    (next as u32).max(1)
}

#[cfg(test)]
#[path = "../../tests/unit/scheduler/qos.rs"]
mod tests;
