use anyhow::Result;

use crate::config::Config;

pub mod error;
pub mod event_loop;
pub mod wayland;

pub use error::BackendError;

/// How the globe is presented on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Ordinary decorated xdg-shell window
    #[default]
    TopLevelWindow,
    /// Full-output layer-shell surface below all windows (`--root`)
    BackgroundLayer,
}

/// Run the Wayland backend until the surface is closed or a stop is requested.
///
/// # Arguments
/// * `config` - Validated settings (file values with CLI overrides applied)
/// * `mode` - Window or desktop background
pub fn run_wayland(config: Config, mode: DisplayMode) -> Result<()> {
    let mut backend = wayland::WaylandBackend::new(config, mode);
    backend.run()
}
