//! Configuration file support for wayearth.
//!
//! Settings are read from `~/.config/wayearth/config.toml` (or a path given on
//! the command line) and cover window defaults, the redraw interval, the view
//! onto the globe and the marker overlay.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod enums;
pub mod types;

pub use enums::{ColorSpec, Projection};
pub use types::{BUILTIN_MARKERS, DisplayConfig, MarkerConfig, ViewConfig};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const MAX_DIMENSION: u32 = 16384;

/// Main configuration structure containing all user settings.
///
/// # Example TOML
/// ```toml
/// [display]
/// title = "wayearth"
/// redraw_interval = 300
///
/// [view]
/// latitude = 48.8
/// longitude = 2.3
/// projection = "orthographic"
///
/// [markers]
/// enabled = true
/// file = "built-in"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Window defaults and redraw timing
    #[serde(default)]
    pub display: DisplayConfig,

    /// Viewing position and projection
    #[serde(default)]
    pub view: ViewConfig,

    /// Marker overlay settings
    #[serde(default)]
    pub markers: MarkerConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Validated ranges:
    /// - `display.width` / `display.height`: 1 - 16384
    /// - `view.latitude`: -90.0 - 90.0
    /// - `view.longitude`: -180.0 - 180.0
    /// - `view.magnification`: 0.1 - 10.0
    /// - `markers.font_size`: 6.0 - 72.0
    ///
    /// Non-finite floats (`nan`, `inf`) fall back to their defaults.
    pub fn validate_and_clamp(&mut self) {
        let view_defaults = ViewConfig::default();
        let marker_defaults = MarkerConfig::default();
        reset_if_not_finite("latitude", &mut self.view.latitude, view_defaults.latitude);
        reset_if_not_finite("longitude", &mut self.view.longitude, view_defaults.longitude);
        reset_if_not_finite(
            "magnification",
            &mut self.view.magnification,
            view_defaults.magnification,
        );
        reset_if_not_finite(
            "marker font_size",
            &mut self.markers.font_size,
            marker_defaults.font_size,
        );

        if !(1..=MAX_DIMENSION).contains(&self.display.width) {
            warn!(
                "Invalid width {}, clamping to 1-{} range",
                self.display.width, MAX_DIMENSION
            );
            self.display.width = self.display.width.clamp(1, MAX_DIMENSION);
        }

        if !(1..=MAX_DIMENSION).contains(&self.display.height) {
            warn!(
                "Invalid height {}, clamping to 1-{} range",
                self.display.height, MAX_DIMENSION
            );
            self.display.height = self.display.height.clamp(1, MAX_DIMENSION);
        }

        if !(-90.0..=90.0).contains(&self.view.latitude) {
            warn!(
                "Invalid latitude {:.2}, clamping to -90.0-90.0 range",
                self.view.latitude
            );
            self.view.latitude = self.view.latitude.clamp(-90.0, 90.0);
        }

        if !(-180.0..=180.0).contains(&self.view.longitude) {
            warn!(
                "Invalid longitude {:.2}, clamping to -180.0-180.0 range",
                self.view.longitude
            );
            self.view.longitude = self.view.longitude.clamp(-180.0, 180.0);
        }

        if !(0.1..=10.0).contains(&self.view.magnification) {
            warn!(
                "Invalid magnification {:.2}, clamping to 0.1-10.0 range",
                self.view.magnification
            );
            self.view.magnification = self.view.magnification.clamp(0.1, 10.0);
        }

        if !(6.0..=72.0).contains(&self.markers.font_size) {
            warn!(
                "Invalid marker font_size {:.1}, clamping to 6.0-72.0 range",
                self.markers.font_size
            );
            self.markers.font_size = self.markers.font_size.clamp(6.0, 72.0);
        }

        if self.display.redraw_interval <= 0 {
            warn!(
                "redraw_interval {} means continuous redraw; expect high CPU usage",
                self.display.redraw_interval
            );
        }
    }

    /// Returns the path to the default configuration file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("wayearth");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default location, or returns defaults if not found.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or is not valid TOML.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }
}

fn reset_if_not_finite(name: &str, value: &mut f64, default: f64) {
    if !value.is_finite() {
        warn!("Invalid {} {}, using default {}", name, value, default);
        *value = default;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.display.redraw_interval, 300);
        assert_eq!(config.display.width, 512);
        assert_eq!(config.view.projection, Projection::Orthographic);
        assert!(config.markers.enabled);
        assert_eq!(config.markers.file, BUILTIN_MARKERS);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[view]\nprojection = \"mercator\"\nlatitude = 45.0\n\n[markers]\nenabled = false\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.view.projection, Projection::Mercator);
        assert_eq!(config.view.latitude, 45.0);
        assert_eq!(config.view.magnification, 1.0);
        assert!(!config.markers.enabled);
        assert_eq!(config.display.title, "wayearth");
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[display]\nwidth = 0\nheight = 99999\n\n[view]\nlatitude = 120.0\nlongitude = -400.0\nmagnification = 0.0\n\n[markers]\nfont_size = 200.0\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.display.width, 1);
        assert_eq!(config.display.height, MAX_DIMENSION);
        assert_eq!(config.view.latitude, 90.0);
        assert_eq!(config.view.longitude, -180.0);
        assert_eq!(config.view.magnification, 0.1);
        assert_eq!(config.markers.font_size, 72.0);
    }

    #[test]
    fn non_finite_values_fall_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[view]\nlatitude = nan\nlongitude = -inf\nmagnification = inf\n\n[markers]\nfont_size = nan\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let defaults = Config::default();
        assert_eq!(config.view.latitude, defaults.view.latitude);
        assert_eq!(config.view.longitude, defaults.view.longitude);
        assert_eq!(config.view.magnification, defaults.view.magnification);
        assert_eq!(config.markers.font_size, defaults.markers.font_size);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[view\nlatitude = ").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
