//! H4 packet writer for the controller side.
//!
//! Each packet goes out as its indicator byte followed by header and
//! payload, written with scatter/gather I/O.

use std::io::IoSlice;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::ControllerTransport;
use crate::error::{BridgeError, Result};
use crate::protocol::Packet;
use crate::proxy::BoxFuture;

/// Controller transport writing H4-framed packets to an async byte stream.
pub struct H4Transport<W> {
    writer: W,
}

impl<W> H4Transport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Release the underlying stream.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> ControllerTransport for H4Transport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn write(&mut self, packet: Packet) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { write_packet(&mut self.writer, &packet).await })
    }
}

/// Write one packet as `[indicator][header][payload]`.
///
/// Tries a single vectored write first and continues with the remainder
/// after a partial write.
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let indicator = [packet.packet_type().indicator()];
    let total_size = indicator.len() + packet.len();

    let slices = [IoSlice::new(&indicator), IoSlice::new(packet.data())];
    let written = writer.write_vectored(&slices).await?;

    if written == 0 && total_size > 0 {
        return Err(write_zero());
    }

    if written < total_size {
        // Slow path: finish whatever the vectored write left behind
        if written < indicator.len() {
            writer.write_all(&indicator[written..]).await?;
            writer.write_all(packet.data()).await?;
        } else {
            writer
                .write_all(&packet.data()[written - indicator.len()..])
                .await?;
        }
    }

    writer.flush().await?;
    Ok(())
}

fn write_zero() -> BridgeError {
    BridgeError::Io(std::io::Error::new(
        std::io::ErrorKind::WriteZero,
        "write_vectored returned 0",
    ))
}
