//! Library exports for the wayearth globe client.
//!
//! The binary is a thin CLI over these modules; they are public so the
//! renderer and configuration can be exercised without a compositor.

pub mod backend;
pub mod config;
pub mod render;
pub mod shm;

pub use config::Config;
