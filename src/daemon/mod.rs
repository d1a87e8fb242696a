//! The daemon: cache (C1, see [`crate::cache`]), subscription manager (C2),
//! IPC server (C3), and process lifecycle (C4).

pub mod lifecycle;
pub mod server;
pub mod state;
pub mod subscription;

pub use lifecycle::run_foreground;
pub use state::DaemonState;
