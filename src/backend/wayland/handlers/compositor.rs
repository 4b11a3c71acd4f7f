// Logs output enter/leave on the globe surface; scale changes are not followed.
use log::debug;
use wayland_client::{Connection, Dispatch, QueueHandle, protocol::wl_surface};

use super::super::state::WaylandState;

impl Dispatch<wl_surface::WlSurface, ()> for WaylandState {
    fn event(
        _state: &mut Self,
        _proxy: &wl_surface::WlSurface,
        event: wl_surface::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_surface::Event::Enter { .. } => debug!("Surface entered an output"),
            wl_surface::Event::Leave { .. } => debug!("Surface left an output"),
            _ => {}
        }
    }
}
