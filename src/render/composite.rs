use crate::foundation::core::{Canvas, Rect};
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u8};

/// Source-over of premultiplied `src` onto `dst` with an extra opacity factor.
pub(crate) fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f64) -> StrataResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(StrataError::surface(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    let op = ((opacity.clamp(0.0, 1.0) * 255.0).round() as i32).clamp(0, 255) as u16;
    if op == 0 {
        return Ok(());
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = mul_div255_u8(u16::from(s[3]), op);
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - u16::from(sa);

        d[3] = add_sat_u8(sa, mul_div255_u8(u16::from(d[3]), inv));
        for c in 0..3 {
            let sc = mul_div255_u8(u16::from(s[c]), op);
            let dc = mul_div255_u8(u16::from(d[c]), inv);
            d[c] = add_sat_u8(sc, dc);
        }
    }
    Ok(())
}

/// Zero every pixel whose center lies inside `rect` (surface pixel space).
pub(crate) fn clear_region(dst: &mut [u8], canvas: Canvas, rect: Rect) {
    if dst.len() != canvas.rgba8_len() {
        tracing::debug!(len = dst.len(), ?canvas, "skipping clear on mismatched buffer");
        return;
    }
    let rect = rect.abs();
    let x0 = rect.x0.round().clamp(0.0, f64::from(canvas.width)) as usize;
    let x1 = rect.x1.round().clamp(0.0, f64::from(canvas.width)) as usize;
    let y0 = rect.y0.round().clamp(0.0, f64::from(canvas.height)) as usize;
    let y1 = rect.y1.round().clamp(0.0, f64::from(canvas.height)) as usize;
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let stride = (canvas.width as usize) * 4;
    for y in y0..y1 {
        let row = y * stride;
        dst[row + x0 * 4..row + x1 * 4].fill(0);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
