// src/blit.rs

//! The only two rendering primitives: rectangular copy and solid fill.

use crate::surface::{Rect, Surface, BYTES_PER_PIXEL};

/// Copy pixels from `src` to `dst`.
///
/// `src_rect` defaults to all of `src`. Only the origin of `dst_rect` is
/// used; it defaults to `(0, 0)`. The copy is clamped to the destination's
/// clip rect: an origin left of or above the clip advances the source origin
/// and shrinks the copy by the same amount, and an overhang past the right or
/// bottom edge shrinks the copy. Pixels that would fall outside either
/// surface are skipped, and with a colour key on `src` matching pixels leave
/// the destination untouched. Everything else is copied as four raw bytes.
pub fn blit(src: &Surface<'_>, src_rect: Option<Rect>, dst: &mut Surface<'_>, dst_rect: Option<Rect>) {
    let src_rect = src_rect.unwrap_or_else(|| src.bounds());
    let mut sx = i64::from(src_rect.x);
    let mut sy = i64::from(src_rect.y);
    let mut w = i64::from(src_rect.w);
    let mut h = i64::from(src_rect.h);

    let (mut dx, mut dy) = dst_rect.map_or((0, 0), |r| (i64::from(r.x), i64::from(r.y)));

    let clip = dst.clip_rect();
    let (clip_x, clip_y) = (i64::from(clip.x), i64::from(clip.y));
    if dx < clip_x {
        sx += clip_x - dx;
        w -= clip_x - dx;
        dx = clip_x;
    }
    if dy < clip_y {
        sy += clip_y - dy;
        h -= clip_y - dy;
        dy = clip_y;
    }
    if dx + w > clip.right() {
        w = clip.right() - dx;
    }
    if dy + h > clip.bottom() {
        h = clip.bottom() - dy;
    }
    if w <= 0 || h <= 0 {
        return;
    }

    // Columns where both the source and destination pixel exist.
    let (src_w, src_h) = (i64::from(src.width()), i64::from(src.height()));
    let (dst_w, dst_h) = (i64::from(dst.width()), i64::from(dst.height()));
    let col_start = 0.max(-sx).max(-dx);
    let col_end = w.min(src_w - sx).min(dst_w - dx);
    if col_start >= col_end {
        return;
    }

    let key = src.color_key();
    let span = (col_end - col_start) as usize * BYTES_PER_PIXEL;
    let src_off = (sx + col_start) as usize * BYTES_PER_PIXEL;
    let dst_off = (dx + col_start) as usize * BYTES_PER_PIXEL;

    for row in 0..h {
        let (syy, dyy) = (sy + row, dy + row);
        if syy < 0 || syy >= src_h || dyy < 0 || dyy >= dst_h {
            continue;
        }
        let src_row = &src.row(syy as u32)[src_off..src_off + span];
        let dst_row = &mut dst.row_mut(dyy as u32)[dst_off..dst_off + span];
        match key {
            None => dst_row.copy_from_slice(src_row),
            Some(key) => {
                for (d, s) in dst_row
                    .chunks_exact_mut(BYTES_PER_PIXEL)
                    .zip(src_row.chunks_exact(BYTES_PER_PIXEL))
                {
                    if !key.matches(s) {
                        d.copy_from_slice(s);
                    }
                }
            }
        }
    }
}

/// Fill `rect` (default: the whole surface) with a solid colour.
///
/// The rect is only intersected with the surface bounds. The clip rect does
/// not apply to fills.
pub fn fill_rect(surface: &mut Surface<'_>, rect: Option<Rect>, r: u8, g: u8, b: u8, a: u8) {
    let area = rect
        .unwrap_or_else(|| surface.bounds())
        .clamped_to(surface.width(), surface.height());
    if area.is_empty() {
        return;
    }

    let pixel = [b, g, r, a];
    let start = area.x as usize * BYTES_PER_PIXEL;
    let end = start + area.w as usize * BYTES_PER_PIXEL;
    for y in area.y as u32..area.y as u32 + area.h {
        for p in surface.row_mut(y)[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
            p.copy_from_slice(&pixel);
        }
    }
}
