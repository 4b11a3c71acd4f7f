// Dispatch implementations for every protocol object the backend creates, split by
// protocol; objects without events are wired up with `delegate_noop!`.
use wayland_client::{
    delegate_noop,
    protocol::{wl_compositor::WlCompositor, wl_shm::WlShm, wl_shm_pool::WlShmPool},
};
use wayland_protocols::xdg::decoration::zv1::client::zxdg_decoration_manager_v1::ZxdgDecorationManagerV1;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::ZwlrLayerShellV1;

use super::state::WaylandState;

delegate_noop!(WaylandState: ignore WlCompositor);
delegate_noop!(WaylandState: ignore WlShm);
delegate_noop!(WaylandState: WlShmPool);
delegate_noop!(WaylandState: ZxdgDecorationManagerV1);
delegate_noop!(WaylandState: ZwlrLayerShellV1);

mod buffer;
mod compositor;
mod layer;
mod registry;
mod xdg;
