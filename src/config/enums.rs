//! Configuration enum types.

use crate::render::color::{self, Color};
use log::warn;
use serde::{Deserialize, Serialize};

/// Map projection used for the globe and marker placement.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Projection {
    /// Globe seen from space; the far hemisphere is hidden.
    #[default]
    Orthographic,
    /// Conformal cylindrical map, latitude stretched towards the poles.
    Mercator,
    /// Central cylindrical map (`y = tan(latitude)`).
    Cylindrical,
}

impl std::str::FromStr for Projection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "orthographic" | "orth" => Ok(Self::Orthographic),
            "mercator" | "merc" => Ok(Self::Mercator),
            "cylindrical" | "cyl" => Ok(Self::Cylindrical),
            other => Err(format!(
                "unknown projection '{other}' (expected orthographic, mercator or cylindrical)"
            )),
        }
    }
}

/// Color specification - either a named color or RGB values.
///
/// # Examples
/// ```toml
/// # Named color
/// color = "red"
///
/// # Custom RGB color (0-255 per component)
/// color = [255, 128, 0]
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ColorSpec {
    /// Named color: red, green, blue, yellow, orange, pink, white, black
    Name(String),
    /// RGB color as [red, green, blue] where each component is 0-255
    Rgb([u8; 3]),
}

impl ColorSpec {
    /// Converts the color specification to a [`Color`].
    ///
    /// Unknown color names fall back to `fallback` with a warning.
    pub fn to_color(&self, fallback: Color) -> Color {
        match self {
            ColorSpec::Name(name) => color::by_name(name).unwrap_or_else(|| {
                warn!("Unknown color '{}', using fallback", name);
                fallback
            }),
            ColorSpec::Rgb([r, g, b]) => Color::from_rgb8(*r, *g, *b),
        }
    }
}
