//! Composes one frame: scene scanlines first, marker overlay on top.

use anyhow::{Context as _, Result, bail};
use log::{debug, warn};

use super::Geometry;
use super::color::{BLACK, RED};
use super::globe::ShadedGlobe;
use super::markers::{self, MarkerSource, MarkerStyle};
use super::scanline::{RowWriter, ScanlineSource};
use crate::config::Config;

/// Renders frames into caller-owned ARGB8888 pixel memory.
pub struct FrameRenderer {
    scene: Box<dyn ScanlineSource>,
    markers: Option<Box<dyn MarkerSource>>,
    style: MarkerStyle,
}

impl FrameRenderer {
    pub fn new(
        scene: Box<dyn ScanlineSource>,
        markers: Option<Box<dyn MarkerSource>>,
        style: MarkerStyle,
    ) -> Self {
        Self {
            scene,
            markers,
            style,
        }
    }

    /// Builds the built-in globe scene and marker source from settings.
    pub fn from_config(config: &Config) -> Self {
        let markers = config
            .markers
            .enabled
            .then(|| markers::source_for(&config.markers.file));
        let style = MarkerStyle {
            font: format!(
                "{} {}",
                config.markers.font_family, config.markers.font_size
            ),
            highlight: config.markers.color.to_color(RED),
            outline: config.markers.outline_color.to_color(BLACK),
        };

        Self::new(Box::new(ShadedGlobe::new(&config.view)), markers, style)
    }

    /// Fills the first `geometry.frame_len()` bytes of `pixels` with a new frame.
    ///
    /// Every pixel written has alpha `0xFF`. A marker source that fails to
    /// load is logged and the frame is drawn without markers.
    pub fn render(&mut self, pixels: &mut [u8], geometry: Geometry) -> Result<()> {
        let needed = geometry.frame_len();
        if pixels.len() < needed {
            bail!(
                "pixel buffer holds {} bytes, {} frame needs {}",
                pixels.len(),
                geometry,
                needed
            );
        }
        let pixels = &mut pixels[..needed];

        self.scene.prepare(geometry);
        let mut writer = RowWriter::new(pixels, geometry);
        self.scene.render(&mut writer);
        let rows = writer.rows_written();
        if rows != geometry.height as usize {
            warn!(
                "Scene produced {} of {} rows for a {} frame",
                rows, geometry.height, geometry
            );
        }

        let Some(source) = self.markers.as_mut() else {
            return Ok(());
        };
        let markers = match source.load() {
            Ok(markers) => markers,
            Err(err) => {
                warn!("Skipping markers this frame: {:#}", err);
                return Ok(());
            }
        };
        if markers.is_empty() {
            return Ok(());
        }

        let width = i32::try_from(geometry.width).context("frame width exceeds i32")?;
        let height = i32::try_from(geometry.height).context("frame height exceeds i32")?;
        let stride = i32::try_from(geometry.stride()).context("frame stride exceeds i32")?;

        // SAFETY: `pixels` is exclusively borrowed for the rest of this
        // function, is exactly `stride * height` bytes long and the surface is
        // finished before the borrow ends.
        let surface = unsafe {
            cairo::ImageSurface::create_for_data_unsafe(
                pixels.as_mut_ptr(),
                cairo::Format::ARgb32,
                width,
                height,
                stride,
            )
        }
        .context("Failed to wrap frame in a cairo surface")?;
        let ctx = cairo::Context::new(&surface).context("Failed to create cairo context")?;

        let view = self.scene.view();
        let mut drawn = 0usize;
        for marker in &markers {
            let Some((x, y)) = view.project(marker.latitude, marker.longitude) else {
                continue;
            };
            markers::draw_marker(&ctx, x as i32, y as i32, marker, &self.style)
                .context("Failed to draw marker")?;
            drawn += 1;
        }
        debug!("Drew {} of {} markers", drawn, markers.len());

        drop(ctx);
        surface.flush();
        surface.finish();
        Ok(())
    }
}
