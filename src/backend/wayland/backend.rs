// Coordinates backend startup/shutdown and drives the event loop while delegating
// rendering & protocol state to `WaylandState` and its handler modules.
use std::io;
use std::os::fd::AsFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use log::{debug, info};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use wayland_client::{Connection, EventQueue, backend::ReadEventsGuard, backend::WaylandError};

use super::buffer::{BufferManager, ShmPoolFactory};
use super::session;
use super::state::WaylandState;
use super::surface::SurfaceController;
use crate::backend::event_loop::{self, LoopDriver, Readiness, RedrawTimer, redraw_interval};
use crate::backend::{BackendError, DisplayMode};
use crate::config::Config;
use crate::render::FrameRenderer;

/// Wayland backend state
pub struct WaylandBackend {
    config: Config,
    mode: DisplayMode,
}

impl WaylandBackend {
    pub fn new(config: Config, mode: DisplayMode) -> Self {
        Self { config, mode }
    }

    pub fn run(&mut self) -> Result<()> {
        info!("Starting Wayland backend ({:?})", self.mode);

        let conn = session::open_connection()?;
        let (globals, mut event_queue) = session::connect(&conn)?;
        let qh = event_queue.handle();

        let surface =
            SurfaceController::create(&globals, self.mode, &self.config.display.title, &qh)?;
        let buffers = BufferManager::new(ShmPoolFactory::new(globals.shm.clone(), qh.clone()));
        let renderer = FrameRenderer::from_config(&self.config);
        let mut state = WaylandState::new(surface, buffers, renderer);

        // Commit without a buffer so the compositor sends the first configure
        state.surface.commit();
        event_queue
            .roundtrip(&mut state)
            .map_err(BackendError::Dispatch)
            .context("Initial configure round-trip failed")?;
        if let Some(err) = state.take_fatal() {
            return Err(err);
        }

        if state.surface.geometry().is_none() {
            let (width, height) = (self.config.display.width, self.config.display.height);
            info!("Compositor left the size to us, using {}x{}", width, height);
            state.update_surface_geometry(width, height);
            if let Some(err) = state.take_fatal() {
                return Err(err);
            }
        }

        let timer = RedrawTimer::new(redraw_interval(self.config.display.redraw_interval))?;

        let terminate = Arc::new(AtomicBool::new(false));
        for signal in [SIGINT, SIGTERM] {
            flag::register(signal, Arc::clone(&terminate))
                .context("Failed to install signal handler")?;
        }

        let mut driver = WaylandDriver {
            conn,
            event_queue,
            state,
            timer,
            pending_read: None,
            terminate,
        };
        let loop_result = event_loop::run(&mut driver);

        if driver.terminate.load(Ordering::Relaxed) {
            info!("Stop requested by signal");
        }
        info!("Wayland backend exiting");

        // A handler failure is the root cause of whatever the loop saw after it
        match driver.state.take_fatal() {
            Some(err) => Err(err),
            None => loop_result,
        }
    }
}

/// [`LoopDriver`] over the display connection and the redraw timer.
struct WaylandDriver {
    conn: Connection,
    event_queue: EventQueue<WaylandState>,
    state: WaylandState,
    timer: RedrawTimer,
    pending_read: Option<ReadEventsGuard>,
    terminate: Arc<AtomicBool>,
}

impl LoopDriver for WaylandDriver {
    fn running(&self) -> bool {
        self.state.run.running && !self.terminate.load(Ordering::Relaxed)
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        loop {
            match self.conn.flush() {
                Ok(()) => return Ok(()),
                Err(WaylandError::Io(err)) if err.kind() == io::ErrorKind::WouldBlock => {
                    // Socket buffer full: wait until the compositor drains it
                    let backend = self.conn.backend();
                    let mut fds = [PollFd::new(backend.poll_fd(), PollFlags::POLLOUT)];
                    match poll(&mut fds, PollTimeout::NONE) {
                        Ok(_) | Err(Errno::EINTR) => {}
                        Err(err) => return Err(BackendError::Wait(err)),
                    }
                }
                Err(err) => return Err(BackendError::Flush(err)),
            }
        }
    }

    fn wait(&mut self) -> Result<Readiness, BackendError> {
        self.pending_read = None;

        let Some(guard) = self.event_queue.prepare_read() else {
            // Events are already queued; handle them before sleeping
            return Ok(Readiness {
                display: true,
                timer: false,
            });
        };

        let ready = {
            let mut fds = [
                PollFd::new(guard.connection_fd(), PollFlags::POLLIN),
                PollFd::new(self.timer.as_fd(), PollFlags::POLLIN),
            ];
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => {}
                Err(Errno::EINTR) => return Ok(Readiness::default()),
                Err(err) => return Err(BackendError::Wait(err)),
            }

            let readable = |fd: &PollFd| {
                fd.revents().is_some_and(|events| {
                    events.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
                })
            };
            Readiness {
                display: readable(&fds[0]),
                timer: readable(&fds[1]),
            }
        };

        if ready.display {
            self.pending_read = Some(guard);
        }
        Ok(ready)
    }

    fn dispatch(&mut self) -> Result<(), BackendError> {
        if let Some(guard) = self.pending_read.take() {
            match guard.read() {
                Ok(_) => {}
                Err(WaylandError::Io(err)) if err.kind() == io::ErrorKind::WouldBlock => {}
                Err(err) => return Err(BackendError::Read(err)),
            }
        }

        let handled = self
            .event_queue
            .dispatch_pending(&mut self.state)
            .map_err(BackendError::Dispatch)?;
        debug!("Dispatched {} events", handled);
        Ok(())
    }

    fn drain_timer(&mut self) -> Result<(), BackendError> {
        self.timer.drain()
    }

    fn render_frame(&mut self) -> Result<()> {
        self.state.render_frame()
    }
}
