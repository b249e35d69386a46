use resvg::tiny_skia;
use smallvec::SmallVec;

use crate::foundation::error::{DemuxError, DemuxResult};

/// Axis-aligned damaged region in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl DamageRect {
    /// Rectangle at `(x, y)`.
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Part of the rect inside a `width x height` surface.
    pub fn clip(&self, width: u32, height: u32) -> Option<tiny_skia::IntRect> {
        let x0 = i64::from(self.x).max(0);
        let y0 = i64::from(self.y).max(0);
        let x1 = (i64::from(self.x) + i64::from(self.width)).min(i64::from(width));
        let y1 = (i64::from(self.y) + i64::from(self.height)).min(i64::from(height));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        tiny_skia::IntRect::from_xywh(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

/// Damage collected for one paint. Most frames carry a handful of rects.
pub type DamageList = SmallVec<[DamageRect; 8]>;

/// How a render feature writes into the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    /// Replace destination pixels.
    Fill,
    /// Composite over existing pixels.
    Blend,
}

impl DrawMode {
    /// Matching tiny-skia blend mode.
    pub fn blend_mode(self) -> tiny_skia::BlendMode {
        match self {
            Self::Fill => tiny_skia::BlendMode::Source,
            Self::Blend => tiny_skia::BlendMode::SourceOver,
        }
    }
}

/// Premultiplied RGBA8 drawing surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pixmap: tiny_skia::Pixmap,
}

impl Surface {
    /// Transparent surface. Fails for a zero or oversized area.
    pub fn new(width: u32, height: u32) -> DemuxResult<Self> {
        let pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
            DemuxError::validation(format!("cannot allocate {width}x{height} surface"))
        })?;
        Ok(Self { pixmap })
    }

    /// Wrap premultiplied RGBA8 bytes. `data` must hold exactly `width * height` pixels.
    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> DemuxResult<Self> {
        let size = tiny_skia::IntSize::from_wh(width, height)
            .ok_or_else(|| DemuxError::validation("surface size must be non-zero"))?;
        let pixmap = tiny_skia::Pixmap::from_vec(data, size).ok_or_else(|| {
            DemuxError::validation(format!("pixel data does not match {width}x{height}"))
        })?;
        Ok(Self { pixmap })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// The whole surface as one damage rectangle.
    pub fn full_rect(&self) -> DamageRect {
        DamageRect::new(0, 0, self.width(), self.height())
    }

    /// Premultiplied RGBA8 bytes, row-major, tightly packed.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Underlying pixmap.
    pub fn pixmap(&self) -> &tiny_skia::Pixmap {
        &self.pixmap
    }

    /// Underlying pixmap, mutable.
    pub fn pixmap_mut(&mut self) -> &mut tiny_skia::Pixmap {
        &mut self.pixmap
    }

    /// Replace the pixels inside `rects` with an `0xAARRGGBB` color.
    pub fn fill_rects(&mut self, argb: u32, rects: &[DamageRect]) {
        let [a, r, g, b] = argb.to_be_bytes();
        let mut paint = tiny_skia::Paint::default();
        paint.set_color_rgba8(r, g, b, a);
        paint.blend_mode = tiny_skia::BlendMode::Source;
        paint.anti_alias = false;

        let (w, h) = (self.width(), self.height());
        for rect in rects {
            let Some(clip) = rect.clip(w, h) else {
                continue;
            };
            self.pixmap
                .fill_rect(clip.to_rect(), &paint, tiny_skia::Transform::identity(), None);
        }
    }

    /// Copy `src` into `rects` of this surface using `mode`. Both surfaces must share a size.
    pub fn draw_from(&mut self, src: &Surface, mode: DrawMode, rects: &[DamageRect]) {
        let paint = tiny_skia::PixmapPaint {
            blend_mode: mode.blend_mode(),
            ..Default::default()
        };
        let (w, h) = (self.width(), self.height());
        for rect in rects {
            let Some(clip) = rect.clip(w, h) else {
                continue;
            };
            let Some(part) = src.pixmap.clone_rect(clip) else {
                continue;
            };
            self.pixmap.draw_pixmap(
                clip.x(),
                clip.y(),
                part.as_ref(),
                &paint,
                tiny_skia::Transform::identity(),
                None,
            );
        }
    }

    /// Premultiplied pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let p = self.pixmap.pixel(x, y)?;
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/surface.rs"]
mod tests;
