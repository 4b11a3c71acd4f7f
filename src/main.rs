use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{ArgAction, Parser};
use wayearth::backend::{self, DisplayMode};
use wayearth::config::{Config, Projection};

#[derive(Parser, Debug)]
#[command(name = "wayearth")]
#[command(
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("WAYEARTH_GIT_HASH"), ")"),
    about = "Shaded globe with city markers for Wayland compositors"
)]
struct Cli {
    /// Draw on the desktop background (needs wlr-layer-shell) instead of a window
    #[arg(long, action = ArgAction::SetTrue)]
    root: bool,

    /// Seconds between redraws; 0 or less redraws continuously
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    wait: Option<i64>,

    /// Projection (orthographic, mercator or cylindrical)
    #[arg(long, value_name = "PROJECTION")]
    proj: Option<Projection>,

    /// Centre the view on a latitude,longitude pair in degrees
    #[arg(long, value_name = "LAT,LON", allow_hyphen_values = true, value_parser = parse_position)]
    pos: Option<(f64, f64)>,

    /// Marker file to draw, or "built-in" for the compiled-in city list
    #[arg(long, value_name = "PATH")]
    markerfile: Option<String>,

    /// Do not draw markers
    #[arg(long, action = ArgAction::SetTrue)]
    nomarkers: bool,

    /// Read settings from this file instead of ~/.config/wayearth/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Command-line flags win over config file values.
    fn apply(&self, config: &mut Config) {
        if let Some(wait) = self.wait {
            config.display.redraw_interval = wait;
        }
        if let Some(projection) = self.proj {
            config.view.projection = projection;
        }
        if let Some((latitude, longitude)) = self.pos {
            config.view.latitude = latitude;
            config.view.longitude = longitude;
        }
        if let Some(file) = &self.markerfile {
            config.markers.file = file.clone();
            config.markers.enabled = true;
        }
        if self.nomarkers {
            config.markers.enabled = false;
        }
    }

    fn display_mode(&self) -> DisplayMode {
        if self.root {
            DisplayMode::BackgroundLayer
        } else {
            DisplayMode::TopLevelWindow
        }
    }
}

fn parse_position(value: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON but got '{value}'"))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(format!("latitude {latitude} outside -90..90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(format!("longitude {longitude} outside -180..180"));
    }
    Ok((latitude, longitude))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|err| {
            log::warn!("Failed to load config: {:#}. Using defaults.", err);
            Config::default()
        }),
    };
    cli.apply(&mut config);
    config.validate_and_clamp();

    // Check for Wayland environment
    if std::env::var_os("WAYLAND_DISPLAY").is_none() {
        log::error!("WAYLAND_DISPLAY not set - this application requires Wayland.");
        log::error!("Please run on a Wayland compositor (Sway, Hyprland, etc.).");
        return Err(anyhow!("WAYLAND_DISPLAY not set"));
    }

    log::info!(
        "Showing globe at {:.2},{:.2} ({:?}), redraw every {}s",
        config.view.latitude,
        config.view.longitude,
        config.view.projection,
        config.display.redraw_interval
    );
    backend::run_wayland(config, cli.display_mode())?;

    log::info!("wayearth closed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_parses_signed_pairs() {
        assert_eq!(parse_position("-33.87,151.21"), Ok((-33.87, 151.21)));
        assert_eq!(parse_position(" 10 , -20 "), Ok((10.0, -20.0)));
    }

    #[test]
    fn position_rejects_malformed_or_out_of_range() {
        assert!(parse_position("10").is_err());
        assert!(parse_position("north,20").is_err());
        assert!(parse_position("91,0").is_err());
        assert!(parse_position("0,181").is_err());
    }

    #[test]
    fn flags_override_config_values() {
        let cli = Cli::parse_from([
            "wayearth",
            "--wait",
            "-1",
            "--proj",
            "merc",
            "--pos",
            "-10,20",
            "--nomarkers",
            "--root",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.display.redraw_interval, -1);
        assert_eq!(config.view.projection, Projection::Mercator);
        assert_eq!((config.view.latitude, config.view.longitude), (-10.0, 20.0));
        assert!(!config.markers.enabled);
        assert_eq!(cli.display_mode(), DisplayMode::BackgroundLayer);
    }

    #[test]
    fn markerfile_selects_source_and_enables_markers() {
        let cli = Cli::parse_from(["wayearth", "--markerfile", "/tmp/cities.txt"]);
        let mut config = Config::default();
        config.markers.enabled = false;
        cli.apply(&mut config);

        assert_eq!(config.markers.file, "/tmp/cities.txt");
        assert!(config.markers.enabled);
        assert_eq!(cli.display_mode(), DisplayMode::TopLevelWindow);
    }
}
