// Responds to layer-shell configure/close events for the background surface.
use log::info;
use wayland_client::{Connection, Dispatch, QueueHandle};
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1::{
    self, ZwlrLayerSurfaceV1,
};

use super::super::state::WaylandState;

impl Dispatch<ZwlrLayerSurfaceV1, ()> for WaylandState {
    fn event(
        state: &mut Self,
        proxy: &ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => {
                info!("Layer surface configured: {}x{}", width, height);
                proxy.ack_configure(serial);
                state.update_surface_geometry(width, height);
                state.after_acknowledge();
            }
            zwlr_layer_surface_v1::Event::Closed => state.close(),
            _ => {}
        }
    }
}
