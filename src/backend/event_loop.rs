//! Single-threaded redraw loop multiplexing the display socket and a timer.
//!
//! The loop itself only sequences flush, wait, dispatch and render; the
//! Wayland specifics live behind [`LoopDriver`].

use std::os::fd::{AsFd, BorrowedFd};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};

use super::error::BackendError;

/// Which sources woke the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub display: bool,
    pub timer: bool,
}

impl Readiness {
    /// A wake with nothing ready, e.g. poll interrupted by a signal.
    pub fn is_spurious(&self) -> bool {
        !self.display && !self.timer
    }
}

/// The operations the redraw loop sequences.
pub trait LoopDriver {
    /// Whether another iteration should run.
    fn running(&self) -> bool;

    /// Sends every queued request to the compositor.
    fn flush(&mut self) -> Result<(), BackendError>;

    /// Blocks until the display or the timer is readable.
    fn wait(&mut self) -> Result<Readiness, BackendError>;

    /// Reads and handles all pending display events.
    fn dispatch(&mut self) -> Result<(), BackendError>;

    /// Consumes the pending timer expirations.
    fn drain_timer(&mut self) -> Result<(), BackendError>;

    /// Draws and submits one frame.
    fn render_frame(&mut self) -> Result<()>;
}

/// Runs the loop until `driver.running()` turns false.
///
/// One frame is rendered before the first wait; after that a frame is
/// rendered once per timer expiration batch.
pub fn run<D: LoopDriver>(driver: &mut D) -> Result<()> {
    driver
        .render_frame()
        .context("Failed to render initial frame")?;

    while driver.running() {
        driver.flush()?;

        let ready = driver.wait()?;
        if ready.is_spurious() {
            debug!("Spurious wake-up, polling again");
            continue;
        }

        if ready.display {
            driver.dispatch()?;
        }

        if ready.timer {
            driver.drain_timer()?;
            if driver.running() {
                driver.render_frame().context("Failed to render frame")?;
            } else {
                debug!("Skipping redraw, surface is shutting down");
            }
        }
    }

    info!("Event loop finished");
    Ok(())
}

/// Time between redraws for a configured interval in seconds.
///
/// Non-positive values select continuous redraw (1 ns), which keeps one core
/// busy rendering.
pub fn redraw_interval(seconds: i64) -> Duration {
    match u64::try_from(seconds) {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => Duration::from_nanos(1),
    }
}

/// Periodic monotonic timer backed by a timerfd.
pub struct RedrawTimer {
    fd: TimerFd,
}

impl RedrawTimer {
    pub fn new(interval: Duration) -> Result<Self, BackendError> {
        let fd = TimerFd::new(ClockId::CLOCK_MONOTONIC, TimerFlags::TFD_CLOEXEC)
            .map_err(BackendError::Timer)?;
        fd.set(
            Expiration::Interval(TimeSpec::from_duration(interval)),
            TimerSetTimeFlags::empty(),
        )
        .map_err(BackendError::Timer)?;
        debug!("Redraw timer armed every {:?}", interval);
        Ok(Self { fd })
    }

    /// Reads the expiration counter; only call once poll reports it readable.
    pub fn drain(&self) -> Result<(), BackendError> {
        self.fd.wait().map_err(BackendError::Timer)
    }
}

impl AsFd for RedrawTimer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Copy)]
    enum Step {
        Wake(Readiness),
        /// Display readable and the dispatched events close the surface.
        Close { timer: bool },
        Fail,
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Flush,
        Wait,
        Dispatch,
        Drain,
        Render,
    }

    struct ScriptedDriver {
        steps: VecDeque<Step>,
        running: bool,
        close_on_dispatch: bool,
        calls: Vec<Call>,
    }

    impl ScriptedDriver {
        fn new(steps: impl IntoIterator<Item = Step>) -> Self {
            Self {
                steps: steps.into_iter().collect(),
                running: true,
                close_on_dispatch: false,
                calls: Vec::new(),
            }
        }

        fn renders(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Render).count()
        }
    }

    impl LoopDriver for ScriptedDriver {
        fn running(&self) -> bool {
            self.running
        }

        fn flush(&mut self) -> Result<(), BackendError> {
            self.calls.push(Call::Flush);
            Ok(())
        }

        fn wait(&mut self) -> Result<Readiness, BackendError> {
            self.calls.push(Call::Wait);
            match self.steps.pop_front() {
                Some(Step::Wake(ready)) => Ok(ready),
                Some(Step::Close { timer }) => {
                    self.close_on_dispatch = true;
                    Ok(Readiness {
                        display: true,
                        timer,
                    })
                }
                Some(Step::Fail) => Err(BackendError::Wait(nix::errno::Errno::EBADF)),
                None => {
                    self.running = false;
                    Ok(Readiness::default())
                }
            }
        }

        fn dispatch(&mut self) -> Result<(), BackendError> {
            self.calls.push(Call::Dispatch);
            if self.close_on_dispatch {
                self.running = false;
            }
            Ok(())
        }

        fn drain_timer(&mut self) -> Result<(), BackendError> {
            self.calls.push(Call::Drain);
            Ok(())
        }

        fn render_frame(&mut self) -> Result<()> {
            self.calls.push(Call::Render);
            Ok(())
        }
    }

    const TIMER: Readiness = Readiness {
        display: false,
        timer: true,
    };
    const DISPLAY: Readiness = Readiness {
        display: true,
        timer: false,
    };

    #[test]
    fn first_frame_is_rendered_before_waiting() {
        let mut driver = ScriptedDriver::new([]);
        run(&mut driver).unwrap();

        assert_eq!(driver.calls[0], Call::Render);
        assert_eq!(driver.calls[1], Call::Flush);
        assert_eq!(driver.calls[2], Call::Wait);
        assert_eq!(driver.renders(), 1);
    }

    #[test]
    fn each_timer_wake_renders_one_frame() {
        let mut driver = ScriptedDriver::new([Step::Wake(TIMER), Step::Wake(TIMER)]);
        run(&mut driver).unwrap();

        assert_eq!(driver.renders(), 3);
        let drains = driver.calls.iter().filter(|c| **c == Call::Drain).count();
        assert_eq!(drains, 2);
    }

    #[test]
    fn display_events_dispatch_without_rendering() {
        let mut driver = ScriptedDriver::new([Step::Wake(DISPLAY)]);
        run(&mut driver).unwrap();

        assert!(driver.calls.contains(&Call::Dispatch));
        assert_eq!(driver.renders(), 1);
    }

    #[test]
    fn spurious_wake_polls_again() {
        let mut driver = ScriptedDriver::new([
            Step::Wake(Readiness::default()),
            Step::Wake(TIMER),
        ]);
        run(&mut driver).unwrap();

        assert_eq!(
            &driver.calls[..7],
            &[
                Call::Render,
                Call::Flush,
                Call::Wait,
                Call::Flush,
                Call::Wait,
                Call::Drain,
                Call::Render,
            ]
        );
    }

    #[test]
    fn close_stops_redraws_in_the_same_iteration() {
        let mut driver = ScriptedDriver::new([Step::Close { timer: true }, Step::Wake(TIMER)]);
        run(&mut driver).unwrap();

        assert_eq!(driver.renders(), 1);
        assert_eq!(driver.calls.last(), Some(&Call::Drain));
        assert_eq!(driver.steps.len(), 1);
    }

    #[test]
    fn wait_errors_end_the_loop() {
        let mut driver = ScriptedDriver::new([Step::Fail, Step::Wake(TIMER)]);
        let err = run(&mut driver).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<BackendError>(),
            Some(BackendError::Wait(_))
        ));
        assert_eq!(driver.renders(), 1);
    }

    #[test]
    fn positive_intervals_are_whole_seconds() {
        assert_eq!(redraw_interval(300), Duration::from_secs(300));
        assert_eq!(redraw_interval(1), Duration::from_secs(1));
    }

    #[test]
    fn non_positive_intervals_redraw_continuously() {
        assert_eq!(redraw_interval(0), Duration::from_nanos(1));
        assert_eq!(redraw_interval(-5), Duration::from_nanos(1));
    }

    #[test]
    fn timer_fires_and_drains() {
        let timer = RedrawTimer::new(Duration::from_millis(1)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        timer.drain().unwrap();
    }
}
