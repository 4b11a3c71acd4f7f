// Wayland backend: a single shm-backed surface shown as a window or as a layer-shell
// background, redrawn on a timer.
mod backend;
mod buffer;
mod handlers;
mod session;
mod state;
mod surface;

pub use backend::WaylandBackend;
