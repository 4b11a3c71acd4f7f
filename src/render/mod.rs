//! Frame contents: the globe scene, the marker overlay and how they are
//! composed into an ARGB8888 pixel buffer.

pub mod color;
pub mod frame;
pub mod globe;
pub mod markers;
pub mod scanline;
pub mod view;

pub use frame::FrameRenderer;
pub use globe::ShadedGlobe;
pub use markers::{Marker, MarkerAlign, MarkerSource, MarkerStyle};
pub use scanline::{RowSink, RowWriter, ScanlineSource};
pub use view::View;

/// Bytes per ARGB8888 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Bytes per row of an ARGB8888 buffer with no padding.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Bytes needed for one full frame.
    pub fn frame_len(&self) -> usize {
        self.stride() * self.height as usize
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
