use thiserror::Error;
use wayland_client::backend::WaylandError;
use wayland_client::globals::GlobalError;
use wayland_client::{ConnectError, DispatchError};

use crate::shm::ShmError;

/// Failures that end the Wayland session.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to connect to the Wayland display")]
    Connect(#[source] ConnectError),

    #[error("failed to read the Wayland registry")]
    Registry(#[source] GlobalError),

    #[error("compositor does not advertise {0}")]
    MissingGlobal(&'static str),

    #[error("compositor advertises an unsupported version of {0}")]
    UnsupportedVersion(&'static str),

    #[error("wl_compositor version {advertised} is too old (version 4 required)")]
    CompositorTooOld { advertised: u32 },

    #[error("failed to create wl_surface")]
    SurfaceCreation,

    #[error("background mode requires zwlr_layer_shell_v1, which the compositor lacks")]
    LayerShellMissing,

    #[error("failed to create layer surface")]
    LayerSurfaceCreation,

    #[error("failed to allocate shared memory for the pixel buffer")]
    Allocate(#[from] ShmError),

    #[error("failed to map the pixel buffer")]
    Map(#[source] std::io::Error),

    #[error("pixel buffer of {size} bytes exceeds the protocol limit")]
    BufferTooLarge { size: usize },

    #[error("failed to flush requests to the compositor")]
    Flush(#[source] WaylandError),

    #[error("failed waiting for display or timer events")]
    Wait(#[source] nix::errno::Errno),

    #[error("failed to read events from the compositor")]
    Read(#[source] WaylandError),

    #[error("failed to dispatch Wayland events")]
    Dispatch(#[source] DispatchError),

    #[error("redraw timer failed")]
    Timer(#[source] nix::errno::Errno),
}
