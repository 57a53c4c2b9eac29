//! IPC module for daemon-UI communication

mod protocol;
mod server;

pub use protocol::{OverlayStatus, Request, Response, MAX_MESSAGE_BYTES};
pub use server::{read_message, send_message, Server};
