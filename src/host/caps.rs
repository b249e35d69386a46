use crate::foundation::core::{Fraction, round_up_4};

/// Pixel layouts the output port can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PixelLayout {
    /// 32-bit xRGB stored as `B, G, R, x` bytes. The padding byte is written as `0xff`.
    Bgrx,
}

impl PixelLayout {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgrx => 4,
        }
    }
}

/// Inclusive `[min, max]` range. A range with `min == max` is fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range<T> {
    /// Lower bound.
    pub min: T,
    /// Upper bound.
    pub max: T,
}

impl<T: Ord + Copy> Range<T> {
    /// Create a range, swapping bounds if given out of order.
    pub fn new(a: T, b: T) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Single-value range.
    pub fn fixed(v: T) -> Self {
        Self { min: v, max: v }
    }

    /// Whether the range holds exactly one value.
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    /// Whether `v` lies inside the range.
    pub fn contains(&self, v: T) -> bool {
        self.min <= v && v <= self.max
    }

    /// Overlap of two ranges, `None` when disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(Self { min, max })
    }

    /// Value in the range closest to `target`.
    pub fn nearest(&self, target: T) -> T {
        target.clamp(self.min, self.max)
    }
}

/// A possibly unfixed video format: what a port can produce or accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoCaps {
    /// Pixel layout.
    pub layout: PixelLayout,
    /// Width range in pixels.
    pub width: Range<u32>,
    /// Height range in pixels.
    pub height: Range<u32>,
    /// Frame rate range.
    pub framerate: Range<Fraction>,
    /// Pixel aspect ratio range.
    pub pixel_aspect_ratio: Range<Fraction>,
}

impl VideoCaps {
    /// Most permissive caps the video output can advertise.
    pub fn template() -> Self {
        let max_dim = i32::MAX as u32;
        Self {
            layout: PixelLayout::Bgrx,
            width: Range::new(1, max_dim),
            height: Range::new(1, max_dim),
            framerate: Range::new(Fraction::whole(1), Fraction::MAX),
            pixel_aspect_ratio: Range::new(
                Fraction {
                    num: 1,
                    den: i32::MAX as u32,
                },
                Fraction::MAX,
            ),
        }
    }

    /// Field-wise intersection, `None` if any field is disjoint or layouts differ.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if self.layout != other.layout {
            return None;
        }
        Some(Self {
            layout: self.layout,
            width: self.width.intersect(&other.width)?,
            height: self.height.intersect(&other.height)?,
            framerate: self.framerate.intersect(&other.framerate)?,
            pixel_aspect_ratio: self.pixel_aspect_ratio.intersect(&other.pixel_aspect_ratio)?,
        })
    }

    /// Whether every field holds a single value.
    pub fn is_fixed(&self) -> bool {
        self.width.is_fixed()
            && self.height.is_fixed()
            && self.framerate.is_fixed()
            && self.pixel_aspect_ratio.is_fixed()
    }

    /// Pick a single format, preferring the given targets for fields that are still ranges.
    pub fn fixate(&self, width: u32, height: u32, framerate: Fraction) -> VideoFormat {
        VideoFormat {
            layout: self.layout,
            width: self.width.nearest(width),
            height: self.height.nearest(height),
            framerate: self.framerate.nearest(framerate),
            pixel_aspect_ratio: self.pixel_aspect_ratio.nearest(Fraction::whole(1)),
        }
    }
}

/// A fixed, negotiated video format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoFormat {
    /// Pixel layout.
    pub layout: PixelLayout,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Negotiated frame rate.
    pub framerate: Fraction,
    /// Pixel aspect ratio.
    pub pixel_aspect_ratio: Fraction,
}

impl VideoFormat {
    /// Row stride in bytes, rounded up to 4.
    pub fn stride(&self) -> usize {
        round_up_4(self.width as usize * self.layout.bytes_per_pixel())
    }

    /// Bytes needed for one frame: `ceil4(width * height * 4)`.
    pub fn buffer_size(&self) -> usize {
        round_up_4(self.width as usize * self.height as usize * self.layout.bytes_per_pixel())
    }

    /// The format as fully fixed caps.
    pub fn to_caps(&self) -> VideoCaps {
        VideoCaps {
            layout: self.layout,
            width: Range::fixed(self.width),
            height: Range::fixed(self.height),
            framerate: Range::fixed(self.framerate),
            pixel_aspect_ratio: Range::fixed(self.pixel_aspect_ratio),
        }
    }

    /// Whether `other` has the same frame geometry.
    pub fn same_size(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/caps.rs"]
mod tests;
