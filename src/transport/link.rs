//! Receive side of the controller link.
//!
//! The controller delivers data as chunks through a replaceable
//! "data received" handler. [`ControllerLink`] owns that handler slot and
//! pumps an async byte stream into it, one chunk per read.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

use super::{DataReceivedHandler, DataReceivedHook};
use crate::error::Result;

/// Largest chunk handed to the handler in one call.
pub const MAX_CHUNK_SIZE: usize = 255;

/// Chunk dispatcher for data coming from the controller.
#[derive(Clone, Default)]
pub struct ControllerLink {
    handler: Arc<Mutex<Option<DataReceivedHandler>>>,
}

impl ControllerLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand `chunk` to the installed handler.
    ///
    /// Returns `false` if no handler is installed; the chunk is dropped.
    pub fn dispatch(&self, chunk: &[u8]) -> bool {
        let mut slot = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(handler) => {
                handler(chunk);
                true
            }
            None => {
                tracing::debug!(len = chunk.len(), "no data handler installed, dropping chunk");
                false
            }
        }
    }

    /// Spawn a task reading `reader` and dispatching every read as a chunk.
    ///
    /// The task ends with `Ok(())` when the stream reaches end of file.
    pub fn spawn_reader<R>(&self, reader: R) -> JoinHandle<Result<()>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let link = self.clone();
        tokio::spawn(async move { link.read_loop(reader).await })
    }

    async fn read_loop<R>(&self, mut reader: R) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; MAX_CHUNK_SIZE];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                tracing::debug!("controller stream closed");
                return Ok(());
            }
            self.dispatch(&buf[..n]);
        }
    }
}

impl DataReceivedHook for ControllerLink {
    fn set_data_received_handler(&self, handler: DataReceivedHandler) {
        let mut slot = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(handler);
    }
}
