//! Configuration type definitions.

use super::enums::{ColorSpec, Projection};
use serde::{Deserialize, Serialize};

/// Marker file value selecting the compiled-in city list.
pub const BUILTIN_MARKERS: &str = "built-in";

/// Window and redraw settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Title of the top-level window (ignored in background mode)
    #[serde(default = "default_title")]
    pub title: String,

    /// Width used when the compositor leaves the size to the client (1 - 16384)
    #[serde(default = "default_size")]
    pub width: u32,

    /// Height used when the compositor leaves the size to the client (1 - 16384)
    #[serde(default = "default_size")]
    pub height: u32,

    /// Seconds between redraws. Zero or negative redraws continuously,
    /// which keeps one CPU core busy.
    #[serde(default = "default_redraw_interval")]
    pub redraw_interval: i64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_size(),
            height: default_size(),
            redraw_interval: default_redraw_interval(),
        }
    }
}

/// Where the globe is viewed from and how it is projected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Latitude of the point at the centre of the view in degrees (-90 - 90)
    #[serde(default)]
    pub latitude: f64,

    /// Longitude of the point at the centre of the view in degrees (-180 - 180)
    #[serde(default)]
    pub longitude: f64,

    /// Rotation of the view around its centre in degrees
    #[serde(default)]
    pub rotation: f64,

    /// Map projection (orthographic, mercator, cylindrical)
    #[serde(default)]
    pub projection: Projection,

    /// Scale factor applied on top of the fitted globe/map size (0.1 - 10.0)
    #[serde(default = "default_magnification")]
    pub magnification: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            rotation: 0.0,
            projection: Projection::default(),
            magnification: default_magnification(),
        }
    }
}

/// Marker overlay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Draw markers on top of the globe
    #[serde(default = "default_markers_enabled")]
    pub enabled: bool,

    /// Marker file path, or "built-in" for the compiled-in city list
    #[serde(default = "default_marker_file")]
    pub file: String,

    /// Font family for marker labels
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Label font size in points (6.0 - 72.0)
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// Fill color of marker circles and labels
    #[serde(default = "default_highlight_color")]
    pub color: ColorSpec,

    /// Outline color drawn around circles and labels
    #[serde(default = "default_outline_color")]
    pub outline_color: ColorSpec,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_markers_enabled(),
            file: default_marker_file(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            color: default_highlight_color(),
            outline_color: default_outline_color(),
        }
    }
}

fn default_title() -> String {
    "wayearth".to_string()
}

fn default_size() -> u32 {
    512
}

fn default_redraw_interval() -> i64 {
    300
}

fn default_magnification() -> f64 {
    1.0
}

fn default_markers_enabled() -> bool {
    true
}

fn default_marker_file() -> String {
    BUILTIN_MARKERS.to_string()
}

fn default_font_family() -> String {
    "Sans".to_string()
}

fn default_font_size() -> f64 {
    12.0
}

fn default_highlight_color() -> ColorSpec {
    ColorSpec::Name("red".to_string())
}

fn default_outline_color() -> ColorSpec {
    ColorSpec::Name("black".to_string())
}
