//! Tracks the surface role, its lifecycle phase and the accepted geometry.

use log::{debug, info, warn};
use wayland_client::{Proxy, QueueHandle, protocol::wl_surface::WlSurface};
use wayland_protocols::xdg::{
    decoration::zv1::client::zxdg_toplevel_decoration_v1::{self, ZxdgToplevelDecorationV1},
    shell::client::{xdg_surface::XdgSurface, xdg_toplevel::XdgToplevel},
};
use wayland_protocols_wlr::layer_shell::v1::client::{
    zwlr_layer_shell_v1::Layer,
    zwlr_layer_surface_v1::{Anchor, KeyboardInteractivity, ZwlrLayerSurfaceV1},
};

use super::session::GlobalInterfaces;
use super::state::WaylandState;
use crate::backend::{BackendError, DisplayMode};
use crate::render::Geometry;

const LAYER_NAMESPACE: &str = "wayearth";

/// Lifecycle of the surface from creation to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SurfacePhase {
    Uninitialized,
    SurfaceCreated,
    Configuring,
    BackgroundConfiguring,
    Acknowledged,
    Active,
    Closed,
}

impl SurfacePhase {
    /// Phase after a configure has been acknowledged.
    pub(super) fn acknowledged(self) -> Self {
        match self {
            Self::Active | Self::Closed => self,
            _ => Self::Acknowledged,
        }
    }

    /// Phase after a frame has been committed.
    pub(super) fn presented(self) -> Self {
        match self {
            Self::Acknowledged | Self::Active => Self::Active,
            _ => self,
        }
    }

    /// A buffer may only be attached once the compositor has configured us.
    pub(super) fn can_present(self) -> bool {
        matches!(self, Self::Acknowledged | Self::Active)
    }
}

/// Remembers the size the buffer was last built for.
#[derive(Debug, Default)]
pub(super) struct GeometryTracker {
    current: Option<Geometry>,
}

impl GeometryTracker {
    /// Records a new size, returning it when the buffer must be rebuilt.
    ///
    /// Sizes with a zero dimension mean "client decides" and are ignored, as
    /// is a repeat of the current size.
    pub(super) fn accept(&mut self, width: u32, height: u32) -> Option<Geometry> {
        if width == 0 || height == 0 {
            return None;
        }
        let geometry = Geometry::new(width, height);
        if self.current == Some(geometry) {
            return None;
        }
        self.current = Some(geometry);
        Some(geometry)
    }

    pub(super) fn current(&self) -> Option<Geometry> {
        self.current
    }
}

/// Role object(s) attached to the `wl_surface`.
pub(super) enum SurfaceRole {
    TopLevel {
        xdg_surface: XdgSurface,
        toplevel: XdgToplevel,
        decoration: Option<ZxdgToplevelDecorationV1>,
    },
    Background {
        layer: ZwlrLayerSurfaceV1,
    },
}

/// The client's single surface with its role and lifecycle.
pub(super) struct SurfaceController {
    wl_surface: WlSurface,
    role: SurfaceRole,
    phase: SurfacePhase,
    geometry: GeometryTracker,
}

impl SurfaceController {
    /// Creates the `wl_surface` and gives it the role for `mode`.
    pub(super) fn create(
        globals: &GlobalInterfaces,
        mode: DisplayMode,
        title: &str,
        qh: &QueueHandle<WaylandState>,
    ) -> Result<Self, BackendError> {
        let mut phase = SurfacePhase::Uninitialized;
        debug!("Surface phase: {:?}", phase);

        let wl_surface = globals.compositor.create_surface(qh, ());
        if !wl_surface.is_alive() {
            return Err(BackendError::SurfaceCreation);
        }
        phase = SurfacePhase::SurfaceCreated;
        debug!("Surface phase: {:?}", phase);

        let role = match mode {
            DisplayMode::BackgroundLayer => {
                let layer_shell = globals
                    .layer_shell
                    .as_ref()
                    .ok_or(BackendError::LayerShellMissing)?;
                let layer = layer_shell.get_layer_surface(
                    &wl_surface,
                    None,
                    Layer::Background,
                    LAYER_NAMESPACE.to_string(),
                    qh,
                    (),
                );
                if !layer.is_alive() {
                    return Err(BackendError::LayerSurfaceCreation);
                }
                layer.set_size(0, 0);
                layer.set_anchor(Anchor::Top | Anchor::Bottom | Anchor::Left | Anchor::Right);
                layer.set_keyboard_interactivity(KeyboardInteractivity::None);
                phase = SurfacePhase::BackgroundConfiguring;
                info!("Created background layer surface");
                SurfaceRole::Background { layer }
            }
            DisplayMode::TopLevelWindow => {
                let xdg_surface = globals.wm_base.get_xdg_surface(&wl_surface, qh, ());
                let toplevel = xdg_surface.get_toplevel(qh, ());
                toplevel.set_title(title.to_string());

                let decoration = match globals.decoration_manager.as_ref() {
                    Some(manager) => {
                        let decoration = manager.get_toplevel_decoration(&toplevel, qh, ());
                        decoration.set_mode(zxdg_toplevel_decoration_v1::Mode::ServerSide);
                        Some(decoration)
                    }
                    None => {
                        warn!("No decoration manager, window will be undecorated");
                        None
                    }
                };

                phase = SurfacePhase::Configuring;
                info!("Created top-level window '{}'", title);
                SurfaceRole::TopLevel {
                    xdg_surface,
                    toplevel,
                    decoration,
                }
            }
        };
        debug!("Surface phase: {:?}", phase);

        Ok(Self {
            wl_surface,
            role,
            phase,
            geometry: GeometryTracker::default(),
        })
    }

    pub(super) fn wl_surface(&self) -> &WlSurface {
        &self.wl_surface
    }

    pub(super) fn phase(&self) -> SurfacePhase {
        self.phase
    }

    pub(super) fn geometry(&self) -> Option<Geometry> {
        self.geometry.current()
    }

    /// Filters a configured size through the tracker.
    pub(super) fn accept_geometry(&mut self, width: u32, height: u32) -> Option<Geometry> {
        self.geometry.accept(width, height)
    }

    /// Records an acknowledged configure; returns whether the surface was
    /// already showing frames.
    pub(super) fn acknowledge(&mut self) -> bool {
        let was_active = self.phase == SurfacePhase::Active;
        self.set_phase(self.phase.acknowledged());
        was_active
    }

    pub(super) fn presented(&mut self) {
        self.set_phase(self.phase.presented());
    }

    pub(super) fn close(&mut self) {
        self.set_phase(SurfacePhase::Closed);
    }

    /// Commits pending role state without a buffer, prompting the first configure.
    pub(super) fn commit(&self) {
        self.wl_surface.commit();
    }

    fn set_phase(&mut self, phase: SurfacePhase) {
        if phase != self.phase {
            debug!("Surface phase: {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}

impl Drop for SurfaceController {
    fn drop(&mut self) {
        match &self.role {
            SurfaceRole::TopLevel {
                xdg_surface,
                toplevel,
                decoration,
            } => {
                if let Some(decoration) = decoration {
                    decoration.destroy();
                }
                toplevel.destroy();
                xdg_surface.destroy();
            }
            SurfaceRole::Background { layer } => layer.destroy(),
        }
        self.wl_surface.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_ignores_zero_and_repeated_sizes() {
        let mut tracker = GeometryTracker::default();
        let accepted: Vec<_> = [(0, 0), (800, 600), (800, 600), (1024, 600)]
            .into_iter()
            .filter_map(|(w, h)| tracker.accept(w, h))
            .collect();

        assert_eq!(
            accepted,
            vec![Geometry::new(800, 600), Geometry::new(1024, 600)]
        );
        assert_eq!(tracker.current(), Some(Geometry::new(1024, 600)));
    }

    #[test]
    fn tracker_ignores_a_single_zero_dimension() {
        let mut tracker = GeometryTracker::default();
        assert!(tracker.accept(640, 0).is_none());
        assert!(tracker.accept(0, 480).is_none());
        assert!(tracker.current().is_none());
    }

    #[test]
    fn acknowledge_moves_configuring_phases_forward() {
        assert_eq!(
            SurfacePhase::Configuring.acknowledged(),
            SurfacePhase::Acknowledged
        );
        assert_eq!(
            SurfacePhase::BackgroundConfiguring.acknowledged(),
            SurfacePhase::Acknowledged
        );
        assert_eq!(SurfacePhase::Active.acknowledged(), SurfacePhase::Active);
        assert_eq!(SurfacePhase::Closed.acknowledged(), SurfacePhase::Closed);
    }

    #[test]
    fn only_acknowledged_surfaces_present() {
        assert!(!SurfacePhase::Configuring.can_present());
        assert!(SurfacePhase::Acknowledged.can_present());
        assert_eq!(
            SurfacePhase::Acknowledged.presented(),
            SurfacePhase::Active
        );
        assert_eq!(SurfacePhase::Closed.presented(), SurfacePhase::Closed);
        assert!(!SurfacePhase::Closed.can_present());
    }
}
