//! Built-in scene: a shaded ocean globe with a latitude/longitude graticule.
//!
//! This is a minimal [`ScanlineSource`] so the client has something to show;
//! it carries no land data.

use super::Geometry;
use super::scanline::{RowSink, ScanlineSource};
use super::view::View;
use crate::config::ViewConfig;

const GRATICULE_STEP_DEGREES: f64 = 15.0;
const GRATICULE_HALF_WIDTH_DEGREES: f64 = 0.35;
const OCEAN: [f64; 3] = [28.0, 74.0, 156.0];
const GRID: [f64; 3] = [150.0, 190.0, 235.0];
const AMBIENT: f64 = 0.25;

/// Lit sphere seen through a [`View`].
pub struct ShadedGlobe {
    view: View,
    geometry: Geometry,
    row: Vec<u8>,
}

impl ShadedGlobe {
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            view: View::new(config),
            geometry: Geometry::new(1, 1),
            row: Vec::new(),
        }
    }

    fn shade(&self, px: f64, py: f64) -> [u8; 3] {
        let Some(view_point) = self.view.unproject(px, py) else {
            return [0, 0, 0];
        };

        let world = self.view.unrotate(view_point);
        let latitude = world[1].clamp(-1.0, 1.0).asin().to_degrees();
        let longitude = world[0].atan2(world[2]).to_degrees();
        let base = if on_graticule(latitude) || on_graticule(longitude) {
            GRID
        } else {
            OCEAN
        };

        let light = AMBIENT + (1.0 - AMBIENT) * view_point[2].max(0.0);
        base.map(|channel| (channel * light).round().clamp(0.0, 255.0) as u8)
    }
}

impl ScanlineSource for ShadedGlobe {
    fn prepare(&mut self, geometry: Geometry) {
        self.geometry = geometry;
        self.view.fit(geometry);
        self.row.resize(geometry.width as usize * 3, 0);
    }

    fn render(&mut self, sink: &mut dyn RowSink) {
        let mut row = std::mem::take(&mut self.row);
        for y in 0..self.geometry.height {
            for (x, triplet) in (0..self.geometry.width).zip(row.chunks_exact_mut(3)) {
                let rgb = self.shade(f64::from(x) + 0.5, f64::from(y) + 0.5);
                triplet.copy_from_slice(&rgb);
            }
            sink.write_row(&row);
        }
        self.row = row;
    }

    fn view(&self) -> &View {
        &self.view
    }
}

fn on_graticule(degrees: f64) -> bool {
    let offset = degrees.rem_euclid(GRATICULE_STEP_DEGREES);
    offset < GRATICULE_HALF_WIDTH_DEGREES
        || GRATICULE_STEP_DEGREES - offset < GRATICULE_HALF_WIDTH_DEGREES
}
