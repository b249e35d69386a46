//! Premultiplied RGBA to BGRx conversion for output buffers.

use rayon::prelude::*;

use crate::engine::Surface;
use crate::foundation::error::{DemuxError, DemuxResult};

/// Write `surface` into `dst` as BGRx rows of `stride` bytes. The padding byte is set to 0xff.
pub fn surface_to_bgrx(surface: &Surface, dst: &mut [u8], stride: usize) -> DemuxResult<()> {
    let width = surface.width() as usize;
    let height = surface.height() as usize;
    let row_bytes = width * 4;
    if stride < row_bytes {
        return Err(DemuxError::validation(format!(
            "stride {stride} too small for width {width}"
        )));
    }
    if dst.len() < stride * height {
        return Err(DemuxError::validation(format!(
            "frame buffer holds {} bytes, need {}",
            dst.len(),
            stride * height
        )));
    }

    let src = surface.data();
    dst[..stride * height]
        .par_chunks_mut(stride)
        .zip(src.par_chunks(row_bytes))
        .for_each(|(out, row)| {
            for (o, px) in out[..row_bytes].chunks_exact_mut(4).zip(row.chunks_exact(4)) {
                o[0] = px[2];
                o[1] = px[1];
                o[2] = px[0];
                o[3] = 0xff;
            }
        });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/scheduler/convert.rs"]
mod tests;
