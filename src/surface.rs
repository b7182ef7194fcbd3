// src/surface.rs

//! Pixel surfaces.
//!
//! Every surface is 32 bits per pixel with bytes laid out (B, G, R, A) in
//! memory. A surface either owns its pixels (zero-filled on creation, freed on
//! drop) or borrows a caller's buffer, in which case dropping the surface
//! leaves that buffer untouched.

use crate::error::PlatformError;

pub const BYTES_PER_PIXEL: usize = 4;

/// A rectangle in pixel coordinates. The origin may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.w)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.h)
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Intersection with `[0, width) x [0, height)`. An empty result keeps a
    /// clamped origin so it still lies inside the bounds.
    pub fn clamped_to(&self, width: u32, height: u32) -> Rect {
        let x0 = i64::from(self.x).clamp(0, i64::from(width));
        let y0 = i64::from(self.y).clamp(0, i64::from(height));
        let x1 = self.right().clamp(x0, i64::from(width));
        let y1 = self.bottom().clamp(y0, i64::from(height));
        Rect::new(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

/// Transparent colour for blits out of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorKey {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorKey {
    /// Whether a (B, G, R, A) pixel matches, ignoring alpha.
    #[inline]
    pub fn matches(&self, bgra: &[u8]) -> bool {
        bgra[0] == self.b && bgra[1] == self.g && bgra[2] == self.r
    }
}

#[derive(Debug)]
enum Pixels<'a> {
    Owned(Box<[u8]>),
    Borrowed(&'a mut [u8]),
}

#[derive(Debug)]
pub struct Surface<'a> {
    width: u32,
    height: u32,
    pitch: usize,
    pixels: Pixels<'a>,
    color_key: Option<ColorKey>,
    clip: Rect,
}

impl Surface<'static> {
    /// Allocate a zero-filled surface that owns its pixels.
    pub fn new(width: u32, height: u32) -> Self {
        let pitch = width as usize * BYTES_PER_PIXEL;
        let pixels = vec![0u8; pitch * height as usize].into_boxed_slice();
        Self {
            width,
            height,
            pitch,
            pixels: Pixels::Owned(pixels),
            color_key: None,
            clip: Rect::new(0, 0, width, height),
        }
    }
}

impl<'a> Surface<'a> {
    /// Wrap caller memory without taking ownership of it.
    ///
    /// `pitch` is the byte distance between rows and must cover a full row.
    pub fn from_buffer(
        buffer: &'a mut [u8],
        width: u32,
        height: u32,
        pitch: usize,
    ) -> Result<Self, PlatformError> {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if pitch < row_bytes {
            return Err(PlatformError::InvalidSurface(format!(
                "pitch {} is smaller than a {}-pixel row",
                pitch, width
            )));
        }
        let needed = if height == 0 {
            0
        } else {
            pitch * (height as usize - 1) + row_bytes
        };
        if buffer.len() < needed {
            return Err(PlatformError::InvalidSurface(format!(
                "buffer of {} bytes cannot hold {}x{} at pitch {}",
                buffer.len(),
                width,
                height,
                pitch
            )));
        }
        Ok(Self {
            width,
            height,
            pitch,
            pixels: Pixels::Borrowed(buffer),
            color_key: None,
            clip: Rect::new(0, 0, width, height),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn bytes_per_pixel(&self) -> usize {
        BYTES_PER_PIXEL
    }

    pub fn owns_buffer(&self) -> bool {
        matches!(self.pixels, Pixels::Owned(_))
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        match &self.pixels {
            Pixels::Owned(p) => p,
            Pixels::Borrowed(p) => p,
        }
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        match &mut self.pixels {
            Pixels::Owned(p) => p,
            Pixels::Borrowed(p) => p,
        }
    }

    /// Bytes of row `y`, exactly `width * 4` long.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        let len = self.width as usize * BYTES_PER_PIXEL;
        &self.pixels()[start..start + len]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.pitch;
        let len = self.width as usize * BYTES_PER_PIXEL;
        &mut self.pixels_mut()[start..start + len]
    }

    /// The (B, G, R, A) bytes at `(x, y)`, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = y as usize * self.pitch + x as usize * BYTES_PER_PIXEL;
        let p = &self.pixels()[at..at + BYTES_PER_PIXEL];
        Some([p[0], p[1], p[2], p[3]])
    }

    pub fn set_color_key(&mut self, r: u8, g: u8, b: u8) {
        self.color_key = Some(ColorKey { r, g, b });
    }

    pub fn clear_color_key(&mut self) {
        self.color_key = None;
    }

    pub fn color_key(&self) -> Option<ColorKey> {
        self.color_key
    }

    /// Restrict blit destinations. `None` resets to the whole surface.
    ///
    /// The stored rectangle is always intersected with the surface bounds.
    pub fn set_clip_rect(&mut self, rect: Option<Rect>) {
        self.clip = match rect {
            Some(r) => r.clamped_to(self.width, self.height),
            None => self.bounds(),
        };
    }

    pub fn clip_rect(&self) -> Rect {
        self.clip
    }

    /// Pack a colour as `0x00RRGGBB`.
    ///
    /// This is not the in-memory byte order of the surface; callers that
    /// write packed values directly into pixel memory must account for it.
    pub fn map_rgb(&self, r: u8, g: u8, b: u8) -> u32 {
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn it_should_zero_fill_an_owned_surface() {
        let surface = Surface::new(7, 3);
        assert_eq!(surface.pitch(), 28);
        assert_eq!(surface.pixels().len(), 7 * 3 * 4);
        assert!(surface.pixels().iter().all(|&b| b == 0));
        assert!(surface.owns_buffer());
        assert_eq!(surface.clip_rect(), Rect::new(0, 0, 7, 3));
        assert_eq!(surface.color_key(), None);
        assert_eq!(surface.bytes_per_pixel(), 4);
    }

    #[test]
    fn it_should_leave_a_borrowed_buffer_intact_on_drop() {
        let mut buffer = vec![0xabu8; 4 * 4 * 4];
        {
            let surface = Surface::from_buffer(&mut buffer, 4, 4, 16).unwrap();
            assert!(!surface.owns_buffer());
            assert_eq!(surface.pixel(3, 3), Some([0xab; 4]));
        }
        assert_eq!(buffer.len(), 64);
        assert!(buffer.iter().all(|&b| b == 0xab));
    }

    #[test]
    fn it_should_reject_a_pitch_narrower_than_a_row() {
        let mut buffer = vec![0u8; 64];
        let err = Surface::from_buffer(&mut buffer, 4, 4, 12).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidSurface(_)));
    }

    #[test]
    fn it_should_reject_a_buffer_too_small_for_its_rows() {
        let mut buffer = vec![0u8; 16 * 3];
        assert!(Surface::from_buffer(&mut buffer, 4, 4, 16).is_err());
        // last row only needs width * 4 bytes, not a full pitch
        let mut buffer = vec![0u8; 20 * 3 + 16];
        assert!(Surface::from_buffer(&mut buffer, 4, 4, 20).is_ok());
    }

    #[test]
    fn it_should_clamp_the_clip_rect_to_the_surface() {
        let mut surface = Surface::new(10, 10);
        surface.set_clip_rect(Some(Rect::new(-5, 2, 8, 100)));
        assert_eq!(surface.clip_rect(), Rect::new(0, 2, 3, 8));

        surface.set_clip_rect(Some(Rect::new(20, 20, 5, 5)));
        assert_eq!(surface.clip_rect(), Rect::new(10, 10, 0, 0));

        surface.set_clip_rect(None);
        assert_eq!(surface.clip_rect(), surface.bounds());
    }

    #[test]
    fn it_should_pack_rgb_regardless_of_memory_order() {
        let surface = Surface::new(1, 1);
        assert_eq!(surface.map_rgb(0x12, 0x34, 0x56), 0x0012_3456);
    }

    #[test]
    fn it_should_survive_repeated_create_and_drop_cycles() {
        for n in 1..64u32 {
            let mut surface = Surface::new(n, n);
            surface.pixels_mut()[0] = 1;
            drop(surface);
        }
    }
}
