//! Transport module - controller-side plumbing.
//!
//! Provides:
//! - [`ControllerTransport`] - whole-packet write contract of the controller
//! - [`DataReceivedHook`] - replaceable handler for controller data
//! - [`H4Transport`] / [`ControllerLink`] - both halves over an async stream
//! - [`ControllerEndpoint`] - TCP or Unix socket connection to a controller

mod endpoint;
mod h4;
mod link;

pub use endpoint::{BoxedReader, BoxedWriter, ControllerEndpoint};
pub use h4::{write_packet, H4Transport};
pub use link::{ControllerLink, MAX_CHUNK_SIZE};

use crate::error::Result;
use crate::protocol::Packet;
use crate::proxy::BoxFuture;

/// Handler receiving each chunk of data the controller produces.
pub type DataReceivedHandler = Box<dyn FnMut(&[u8]) + Send>;

/// Packet sink of the controller.
pub trait ControllerTransport: Send + 'static {
    /// Write one complete packet. The transport takes ownership of it.
    fn write(&mut self, packet: Packet) -> BoxFuture<'_, Result<()>>;
}

/// Access to the controller's data received callback.
pub trait DataReceivedHook: Send + 'static {
    /// Replace the handler invoked with data from the controller.
    fn set_data_received_handler(&self, handler: DataReceivedHandler);
}
