// Registry events after the initial round-trip; globals are never rebound.
use log::debug;
use wayland_client::{
    Connection, Dispatch, QueueHandle,
    globals::GlobalListContents,
    protocol::wl_registry,
};

use super::super::state::WaylandState;

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for WaylandState {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => {
                debug!("Global {} added: {} v{}", name, interface, version);
            }
            wl_registry::Event::GlobalRemove { name } => {
                debug!("Global {} removed", name);
            }
            _ => {}
        }
    }
}
