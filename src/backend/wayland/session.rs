//! Connects to the compositor and binds the globals the client needs.

use log::{debug, info};
use wayland_client::{
    Connection, EventQueue,
    globals::{BindError, GlobalList, registry_queue_init},
    protocol::{wl_compositor::WlCompositor, wl_shm::WlShm},
};
use wayland_protocols::xdg::{
    decoration::zv1::client::zxdg_decoration_manager_v1::ZxdgDecorationManagerV1,
    shell::client::xdg_wm_base::XdgWmBase,
};
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::ZwlrLayerShellV1;

use super::state::WaylandState;
use crate::backend::BackendError;

/// Minimum `wl_compositor` version; `damage_buffer` arrived in version 4.
pub(super) const COMPOSITOR_VERSION: u32 = 4;

/// Protocol globals bound once at startup.
pub(super) struct GlobalInterfaces {
    pub(super) compositor: WlCompositor,
    pub(super) shm: WlShm,
    pub(super) wm_base: XdgWmBase,
    pub(super) decoration_manager: Option<ZxdgDecorationManagerV1>,
    pub(super) layer_shell: Option<ZwlrLayerShellV1>,
}

/// Opens the display named by `WAYLAND_DISPLAY`.
pub(super) fn open_connection() -> Result<Connection, BackendError> {
    let conn = Connection::connect_to_env().map_err(BackendError::Connect)?;
    info!("Connected to Wayland display");
    Ok(conn)
}

/// Performs the registry round-trip and binds every global.
pub(super) fn connect(
    conn: &Connection,
) -> Result<(GlobalInterfaces, EventQueue<WaylandState>), BackendError> {
    let (globals, event_queue) =
        registry_queue_init::<WaylandState>(conn).map_err(BackendError::Registry)?;
    let qh = event_queue.handle();

    match advertised_version(&globals, "wl_compositor") {
        None => return Err(BackendError::MissingGlobal("wl_compositor")),
        Some(advertised) if advertised < COMPOSITOR_VERSION => {
            return Err(BackendError::CompositorTooOld { advertised });
        }
        Some(_) => {}
    }

    let compositor = globals
        .bind::<WlCompositor, _, _>(&qh, COMPOSITOR_VERSION..=COMPOSITOR_VERSION, ())
        .map_err(|err| bind_error("wl_compositor", err))?;
    info!("Bound wl_compositor v{}", COMPOSITOR_VERSION);

    let shm = globals
        .bind::<WlShm, _, _>(&qh, 1..=1, ())
        .map_err(|err| bind_error("wl_shm", err))?;
    info!("Bound wl_shm");

    let wm_base = globals
        .bind::<XdgWmBase, _, _>(&qh, 1..=1, ())
        .map_err(|err| bind_error("xdg_wm_base", err))?;
    info!("Bound xdg_wm_base");

    let decoration_manager = match globals.bind::<ZxdgDecorationManagerV1, _, _>(&qh, 1..=1, ())
    {
        Ok(manager) => {
            info!("Bound zxdg_decoration_manager_v1");
            Some(manager)
        }
        Err(err) => {
            debug!("zxdg_decoration_manager_v1 unavailable: {}", err);
            None
        }
    };

    let layer_shell = match globals.bind::<ZwlrLayerShellV1, _, _>(&qh, 1..=1, ()) {
        Ok(shell) => {
            info!("Bound zwlr_layer_shell_v1");
            Some(shell)
        }
        Err(err) => {
            debug!("zwlr_layer_shell_v1 unavailable: {}", err);
            None
        }
    };

    Ok((
        GlobalInterfaces {
            compositor,
            shm,
            wm_base,
            decoration_manager,
            layer_shell,
        },
        event_queue,
    ))
}

fn advertised_version(globals: &GlobalList, interface: &str) -> Option<u32> {
    globals.contents().with_list(|list| {
        list.iter()
            .filter(|global| global.interface == interface)
            .map(|global| global.version)
            .max()
    })
}

fn bind_error(interface: &'static str, err: BindError) -> BackendError {
    match err {
        BindError::NotPresent => BackendError::MissingGlobal(interface),
        _ => BackendError::UnsupportedVersion(interface),
    }
}
