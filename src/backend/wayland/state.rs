// Holds the live Wayland protocol state shared by the backend loop and the handler
// submodules; owns the surface, the pixel buffer and the frame renderer.
use anyhow::{Context, Result, anyhow};
use log::{debug, error, info};

use super::buffer::{BufferManager, ShmPoolFactory};
use super::surface::{SurfaceController, SurfacePhase};
use crate::render::FrameRenderer;

/// What a frame request turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FrameAction {
    /// Draw and commit now
    Render,
    /// No configure acknowledged yet; draw on the first acknowledge
    Defer,
    /// The session is over
    Skip,
}

/// Loop control flags and the redraw bookkeeping.
#[derive(Debug)]
pub(super) struct RunState {
    /// Flips to false exactly once: close, closed, fatal error or signal
    pub(super) running: bool,
    /// Geometry changed since the last submitted frame
    need_redraw: bool,
    // The loop tried to render before the first configure was acknowledged
    first_frame_deferred: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            running: true,
            need_redraw: false,
            first_frame_deferred: false,
        }
    }
}

impl RunState {
    pub(super) fn geometry_changed(&mut self) {
        self.need_redraw = true;
    }

    /// Decides whether a frame may be drawn for a surface in `phase`.
    pub(super) fn frame_action(&mut self, phase: SurfacePhase) -> FrameAction {
        if !self.running {
            FrameAction::Skip
        } else if phase.can_present() {
            FrameAction::Render
        } else {
            self.first_frame_deferred = true;
            FrameAction::Defer
        }
    }

    pub(super) fn frame_submitted(&mut self) {
        self.need_redraw = false;
        self.first_frame_deferred = false;
    }

    /// A configure just acknowledged needs an immediate frame when the size
    /// changed and the surface was either showing frames or owed its first one.
    pub(super) fn redraw_after_acknowledge(&self, was_active: bool) -> bool {
        self.running && self.need_redraw && (was_active || self.first_frame_deferred)
    }

    pub(super) fn stop(&mut self) {
        self.running = false;
    }
}

/// Internal Wayland state shared across modules.
pub(super) struct WaylandState {
    pub(super) surface: SurfaceController,
    pub(super) buffers: BufferManager<ShmPoolFactory>,
    pub(super) renderer: FrameRenderer,
    pub(super) run: RunState,

    // First error raised inside an event handler
    fatal: Option<anyhow::Error>,
    frames_submitted: u64,
}

impl WaylandState {
    pub(super) fn new(
        surface: SurfaceController,
        buffers: BufferManager<ShmPoolFactory>,
        renderer: FrameRenderer,
    ) -> Self {
        Self {
            surface,
            buffers,
            renderer,
            run: RunState::default(),
            fatal: None,
            frames_submitted: 0,
        }
    }

    /// Applies a size from a configure event (or the configured default).
    ///
    /// Rebuilds the pixel buffer and schedules a redraw when the size is
    /// accepted; allocation failures stop the session.
    pub(super) fn update_surface_geometry(&mut self, width: u32, height: u32) {
        let Some(geometry) = self.surface.accept_geometry(width, height) else {
            debug!("Ignoring configure size {}x{}", width, height);
            return;
        };

        info!("Surface geometry now {}", geometry);
        match self.buffers.reconfigure(geometry) {
            Ok(()) => self.run.geometry_changed(),
            Err(err) => self.fail(anyhow!(err).context("Failed to resize pixel buffer")),
        }
    }

    /// Called after `ack_configure`; redraws straight away if the surface is
    /// already showing frames and the configure changed its size.
    pub(super) fn after_acknowledge(&mut self) {
        let was_active = self.surface.acknowledge();
        if self.run.redraw_after_acknowledge(was_active) {
            if let Err(err) = self.render_frame() {
                self.fail(err.context("Failed to redraw after configure"));
            }
        }
    }

    /// Draws a frame into the pixel buffer and commits it to the surface.
    pub(super) fn render_frame(&mut self) -> Result<()> {
        match self.run.frame_action(self.surface.phase()) {
            FrameAction::Render => {}
            FrameAction::Defer => {
                debug!("Deferring frame, surface is {:?}", self.surface.phase());
                return Ok(());
            }
            FrameAction::Skip => return Ok(()),
        }

        let buffer = self
            .buffers
            .current_mut()
            .context("No pixel buffer to render into")?;
        let geometry = buffer.geometry();
        self.renderer
            .render(buffer.pixels_mut(), geometry)
            .context("Failed to render frame")?;

        let wl_surface = self.surface.wl_surface();
        wl_surface.set_buffer_scale(1);
        wl_surface.attach(Some(buffer.handle()), 0, 0);
        wl_surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
        wl_surface.commit();

        self.frames_submitted += 1;
        debug!(
            "Submitted frame {} ({}, {} byte store)",
            self.frames_submitted,
            geometry,
            buffer.capacity()
        );

        self.run.frame_submitted();
        self.surface.presented();
        Ok(())
    }

    /// Ends the session in response to the compositor closing the surface.
    pub(super) fn close(&mut self) {
        info!("Surface closed by compositor");
        self.surface.close();
        self.run.stop();
    }

    /// Records a handler failure and stops the loop; the first error wins.
    pub(super) fn fail(&mut self, err: anyhow::Error) {
        error!("{:#}", err);
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
        self.run.stop();
    }

    pub(super) fn take_fatal(&mut self) -> Option<anyhow::Error> {
        self.fatal.take()
    }
}
