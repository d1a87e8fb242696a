//! The newline-delimited JSON IPC wire protocol (C3/C5 share these shapes)
//! and the client side of it.

pub mod client;
pub mod protocol;

pub use client::IpcClient;
pub use protocol::{IpcRequest, IpcResponse};
