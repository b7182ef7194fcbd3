// src/display/letterbox.rs

//! Aspect-preserving placement of the back buffer inside the client area.
//!
//! Every driver presents through the same geometry so that scaling, centering
//! and the black margins are identical across backends.

use crate::surface::{Rect, Surface, BYTES_PER_PIXEL};

/// Opaque black in (B, G, R, A) order.
pub const MARGIN_BGRA: [u8; 4] = [0, 0, 0, 255];

/// Where the scaled surface lands inside a client area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Letterbox {
    pub client_width: u32,
    pub client_height: u32,
    pub dest: Rect,
}

impl Letterbox {
    /// Fit a `surface_width x surface_height` image into the client area.
    ///
    /// Returns `None` if either size has a zero dimension (minimized window,
    /// empty surface); there is nothing to present then.
    pub fn fit(surface_width: u32, surface_height: u32, client_width: u32, client_height: u32) -> Option<Self> {
        if surface_width == 0 || surface_height == 0 || client_width == 0 || client_height == 0 {
            return None;
        }

        let surface_aspect = f64::from(surface_width) / f64::from(surface_height);
        let client_aspect = f64::from(client_width) / f64::from(client_height);

        let (w, h) = if client_aspect > surface_aspect {
            let h = client_height;
            let w = (f64::from(h) * surface_aspect).round() as u32;
            (w.min(client_width), h)
        } else {
            let w = client_width;
            let h = (f64::from(w) / surface_aspect).round() as u32;
            (w, h.min(client_height))
        };

        let x = (client_width - w) / 2;
        let y = (client_height - h) / 2;

        Some(Self {
            client_width,
            client_height,
            dest: Rect::new(x as i32, y as i32, w, h),
        })
    }

    /// True when the surface maps 1:1 onto the whole client area.
    pub fn is_identity(&self, surface_width: u32, surface_height: u32) -> bool {
        self.dest == Rect::new(0, 0, self.client_width, self.client_height)
            && self.client_width == surface_width
            && self.client_height == surface_height
    }

    /// The black bars around `dest`: left, right, top, bottom. Empty bars
    /// are omitted.
    pub fn margins(&self) -> Vec<Rect> {
        let d = self.dest;
        let (cw, ch) = (self.client_width, self.client_height);
        let right_x = d.x as u32 + d.w;
        let bottom_y = d.y as u32 + d.h;
        [
            Rect::new(0, 0, d.x as u32, ch),
            Rect::new(right_x as i32, 0, cw - right_x, ch),
            Rect::new(d.x, 0, d.w, d.y as u32),
            Rect::new(d.x, bottom_y as i32, d.w, ch - bottom_y),
        ]
        .into_iter()
        .filter(|r| !r.is_empty())
        .collect()
    }

    /// Render `surface` into a tightly packed client-sized BGRA frame.
    ///
    /// Scaling is nearest-neighbour; margins are painted [`MARGIN_BGRA`].
    /// `out` is resized as needed so callers can reuse one allocation.
    pub fn compose(&self, surface: &Surface<'_>, out: &mut Vec<u8>) {
        let (cw, ch) = (self.client_width as usize, self.client_height as usize);
        out.clear();
        out.resize(cw * ch * BYTES_PER_PIXEL, 0);
        for px in out.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&MARGIN_BGRA);
        }

        let d = self.dest;
        if d.is_empty() {
            return;
        }
        let (sw, sh) = (surface.width() as usize, surface.height() as usize);
        let (dx, dy) = (d.x as usize, d.y as usize);
        let (dw, dh) = (d.w as usize, d.h as usize);

        // Column lookup is the same for every row.
        let src_cols: Vec<usize> = (0..dw).map(|col| (col * sw / dw) * BYTES_PER_PIXEL).collect();

        for row in 0..dh {
            let src_row = surface.row(((row * sh) / dh) as u32);
            let start = ((dy + row) * cw + dx) * BYTES_PER_PIXEL;
            let dst_row = &mut out[start..start + dw * BYTES_PER_PIXEL];
            for (dst_px, &src_at) in dst_row.chunks_exact_mut(BYTES_PER_PIXEL).zip(&src_cols) {
                dst_px.copy_from_slice(&src_row[src_at..src_at + BYTES_PER_PIXEL]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blit::fill_rect;
    use test_log::test;

    #[test]
    fn it_should_fit_to_height_when_the_client_is_wider() {
        let lb = Letterbox::fit(640, 480, 1000, 400).unwrap();
        assert_eq!(lb.dest, Rect::new(233, 0, 533, 400));

        let margins = lb.margins();
        assert_eq!(margins.len(), 2);
        assert_eq!(margins[0], Rect::new(0, 0, 233, 400));
        assert_eq!(margins[1], Rect::new(766, 0, 234, 400));
    }

    #[test]
    fn it_should_fit_to_width_when_the_client_is_taller() {
        let lb = Letterbox::fit(640, 480, 800, 1000).unwrap();
        assert_eq!(lb.dest, Rect::new(0, 200, 800, 600));
        assert_eq!(
            lb.margins(),
            vec![Rect::new(0, 0, 800, 200), Rect::new(0, 800, 800, 200)]
        );
    }

    #[test]
    fn it_should_fill_the_client_when_aspects_match() {
        let lb = Letterbox::fit(320, 240, 640, 480).unwrap();
        assert_eq!(lb.dest, Rect::new(0, 0, 640, 480));
        assert!(lb.margins().is_empty());
        assert!(!lb.is_identity(320, 240));
        assert!(Letterbox::fit(320, 240, 320, 240).unwrap().is_identity(320, 240));
    }

    #[test]
    fn it_should_skip_degenerate_sizes() {
        assert_eq!(Letterbox::fit(640, 480, 0, 400), None);
        assert_eq!(Letterbox::fit(0, 480, 640, 400), None);
    }

    #[test]
    fn it_should_compose_scaled_content_and_black_margins() {
        let mut surface = Surface::new(2, 1);
        fill_rect(&mut surface, Some(Rect::new(0, 0, 1, 1)), 255, 0, 0, 255);
        fill_rect(&mut surface, Some(Rect::new(1, 0, 1, 1)), 0, 0, 255, 255);

        // 2:1 surface into 8x2 client -> 4x2 image centred at x=2
        let lb = Letterbox::fit(2, 1, 8, 2).unwrap();
        assert_eq!(lb.dest, Rect::new(2, 0, 4, 2));

        let mut frame = Vec::new();
        lb.compose(&surface, &mut frame);
        assert_eq!(frame.len(), 8 * 2 * 4);

        let px = |x: usize, y: usize| -> [u8; 4] {
            let at = (y * 8 + x) * 4;
            [frame[at], frame[at + 1], frame[at + 2], frame[at + 3]]
        };
        let red = [0, 0, 255, 255];
        let blue = [255, 0, 0, 255];
        for y in 0..2 {
            assert_eq!(px(0, y), MARGIN_BGRA);
            assert_eq!(px(1, y), MARGIN_BGRA);
            assert_eq!(px(2, y), red);
            assert_eq!(px(3, y), red);
            assert_eq!(px(4, y), blue);
            assert_eq!(px(5, y), blue);
            assert_eq!(px(6, y), MARGIN_BGRA);
            assert_eq!(px(7, y), MARGIN_BGRA);
        }
    }
}
