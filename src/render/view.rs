//! View rotation and map projections shared by the globe and the marker overlay.

use std::f64::consts::PI;

use super::Geometry;
use crate::config::{Projection, ViewConfig};

/// Largest |sin(latitude)| fed into the Mercator stretch.
const MERCATOR_LIMIT: f64 = 0.999_999;
/// Cap on projected cylindrical `y` near the poles.
const CYLINDRICAL_LIMIT: f64 = 1.0e4;

/// Maps geocentric unit vectors into view space and onto pixels.
///
/// World coordinates use `x` towards latitude 0 / longitude 90E, `y` towards
/// the north pole and `z` towards latitude 0 / longitude 0. In view space the
/// viewer looks down the negative `z` axis, so visible points have `z > 0`.
#[derive(Debug, Clone)]
pub struct View {
    rotation: [[f64; 3]; 3],
    projection: Projection,
    magnification: f64,
    scale: f64,
    x_offset: f64,
    y_offset: f64,
}

impl View {
    /// Builds a view centred on the configured latitude/longitude.
    ///
    /// The view still has to be fitted to a surface with [`View::fit`].
    pub fn new(config: &ViewConfig) -> Self {
        let (sin_lat, cos_lat) = config.latitude.to_radians().sin_cos();
        let (sin_lon, cos_lon) = config.longitude.to_radians().sin_cos();
        let (sin_rot, cos_rot) = config.rotation.to_radians().sin_cos();

        let around_y = [
            [cos_lon, 0.0, -sin_lon],
            [0.0, 1.0, 0.0],
            [sin_lon, 0.0, cos_lon],
        ];
        let around_x = [
            [1.0, 0.0, 0.0],
            [0.0, cos_lat, -sin_lat],
            [0.0, sin_lat, cos_lat],
        ];
        let around_z = [
            [cos_rot, -sin_rot, 0.0],
            [sin_rot, cos_rot, 0.0],
            [0.0, 0.0, 1.0],
        ];

        Self {
            rotation: multiply(&around_z, &multiply(&around_x, &around_y)),
            projection: config.projection,
            magnification: config.magnification,
            scale: 1.0,
            x_offset: 0.0,
            y_offset: 0.0,
        }
    }

    /// Fits the projection to a surface, centring it.
    pub fn fit(&mut self, geometry: Geometry) {
        let width = f64::from(geometry.width);
        let height = f64::from(geometry.height);
        self.scale = match self.projection {
            Projection::Orthographic => width.min(height) / 2.0 * self.magnification,
            Projection::Mercator | Projection::Cylindrical => {
                width / (2.0 * PI) * self.magnification
            }
        };
        self.x_offset = width / 2.0;
        self.y_offset = height / 2.0;
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Rotates a world vector into view space.
    pub fn rotate(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.rotation;
        [
            m[0][0] * p[0] + m[0][1] * p[1] + m[0][2] * p[2],
            m[1][0] * p[0] + m[1][1] * p[1] + m[1][2] * p[2],
            m[2][0] * p[0] + m[2][1] * p[1] + m[2][2] * p[2],
        ]
    }

    /// Rotates a view-space vector back into world coordinates.
    pub fn unrotate(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.rotation;
        [
            m[0][0] * p[0] + m[1][0] * p[1] + m[2][0] * p[2],
            m[0][1] * p[0] + m[1][1] * p[1] + m[2][1] * p[2],
            m[0][2] * p[0] + m[1][2] * p[1] + m[2][2] * p[2],
        ]
    }

    /// Projects a latitude/longitude (degrees) to pixel coordinates.
    ///
    /// Returns `None` for points on the far side of an orthographic globe.
    /// Cylindrical projections never clip.
    pub fn project(&self, latitude: f64, longitude: f64) -> Option<(f64, f64)> {
        self.project_view(self.rotate(unit_vector(latitude, longitude)))
    }

    /// Projects a view-space vector to pixel coordinates.
    pub fn project_view(&self, p: [f64; 3]) -> Option<(f64, f64)> {
        let (x, y) = match self.projection {
            Projection::Orthographic => {
                if p[2] <= 0.0 {
                    return None;
                }
                (p[0], p[1])
            }
            Projection::Mercator => (p[0].atan2(p[2]), mercator_y(p[1])),
            Projection::Cylindrical => (p[0].atan2(p[2]), cylindrical_y(p[1])),
        };

        Some((self.scale * x + self.x_offset, self.y_offset - self.scale * y))
    }

    /// Maps a pixel position back to a view-space unit vector.
    ///
    /// Returns `None` outside the globe disc or beyond the map's east/west edges.
    pub fn unproject(&self, px: f64, py: f64) -> Option<[f64; 3]> {
        let x = (px - self.x_offset) / self.scale;
        let y = (self.y_offset - py) / self.scale;

        match self.projection {
            Projection::Orthographic => {
                let r2 = x * x + y * y;
                (r2 <= 1.0).then(|| [x, y, (1.0 - r2).sqrt()])
            }
            Projection::Mercator | Projection::Cylindrical => {
                if x.abs() > PI {
                    return None;
                }
                let latitude = match self.projection {
                    Projection::Mercator => y.sinh().atan(),
                    _ => y.atan(),
                };
                let (sin_lat, cos_lat) = latitude.sin_cos();
                let (sin_lon, cos_lon) = x.sin_cos();
                Some([sin_lon * cos_lat, sin_lat, cos_lon * cos_lat])
            }
        }
    }
}

/// Geocentric unit vector for a latitude/longitude in degrees.
pub fn unit_vector(latitude: f64, longitude: f64) -> [f64; 3] {
    let (sin_lat, cos_lat) = latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = longitude.to_radians().sin_cos();
    [sin_lon * cos_lat, sin_lat, cos_lon * cos_lat]
}

fn mercator_y(y: f64) -> f64 {
    y.clamp(-MERCATOR_LIMIT, MERCATOR_LIMIT).atanh()
}

fn cylindrical_y(y: f64) -> f64 {
    let y = y.clamp(-1.0, 1.0);
    let cos_lat = (1.0 - y * y).sqrt();
    if cos_lat <= y.abs() / CYLINDRICAL_LIMIT {
        return CYLINDRICAL_LIMIT.copysign(y);
    }
    y / cos_lat
}

fn multiply(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}
