//! Row-by-row hand-off between a scene generator and the pixel buffer.

use super::Geometry;
use super::view::View;

/// Receives one row of packed 24-bit RGB triplets per call.
pub trait RowSink {
    /// Consumes the next row, top to bottom.
    ///
    /// Rows past the bottom or shorter than the frame width are rejected
    /// and do not count as written.
    ///
    /// The return value is reserved as an abort signal; scene generators are
    /// free to ignore it.
    fn write_row(&mut self, rgb: &[u8]) -> bool;
}

/// Produces the globe image as scanlines.
pub trait ScanlineSource {
    /// Recomputes positions and scan data for a frame of the given size.
    fn prepare(&mut self, geometry: Geometry);

    /// Emits exactly `height` rows of `width` RGB triplets into `sink`.
    fn render(&mut self, sink: &mut dyn RowSink);

    /// View used for the last prepared frame; markers are placed with it.
    fn view(&self) -> &View;
}

/// Writes RGB rows into an ARGB8888 pixel buffer with opaque alpha.
pub struct RowWriter<'a> {
    pixels: &'a mut [u8],
    width: usize,
    height: usize,
    row: usize,
}

impl<'a> RowWriter<'a> {
    /// Starts a frame at row zero.
    ///
    /// `pixels` must hold at least `width * height * 4` bytes.
    pub fn new(pixels: &'a mut [u8], geometry: Geometry) -> Self {
        Self {
            pixels,
            width: geometry.width as usize,
            height: geometry.height as usize,
            row: 0,
        }
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> usize {
        self.row
    }
}

impl RowSink for RowWriter<'_> {
    fn write_row(&mut self, rgb: &[u8]) -> bool {
        if self.row >= self.height || rgb.len() < self.width * 3 {
            return false;
        }

        let start = self.row * self.width * 4;
        let dst = &mut self.pixels[start..start + self.width * 4];
        for (pixel, triplet) in dst.chunks_exact_mut(4).zip(rgb.chunks_exact(3)) {
            pixel.copy_from_slice(&argb(triplet[0], triplet[1], triplet[2]).to_ne_bytes());
        }

        self.row += 1;
        true
    }
}

/// Packs an RGB triplet as `0xAARRGGBB` with alpha forced to `0xFF`.
pub fn argb(r: u8, g: u8, b: u8) -> u32 {
    0xFF00_0000 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}
