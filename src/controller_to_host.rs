//! Proxy transferring data from the controller to the host.
//!
//! The controller hands over already-delimited chunks; they are forwarded
//! to the host link verbatim.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::proxy::{Acquirer, BoxFuture, Proxy};
use crate::reader::ChunkReader;
use crate::transport::DataReceivedHook;

/// Controller-to-host direction.
pub struct ControllerToHost<W, H> {
    host_tx: W,
    hook: H,
}

impl<W, H> ControllerToHost<W, H>
where
    W: AsyncWrite + Unpin + Send + 'static,
    H: DataReceivedHook,
{
    /// Create a proxy writing to `host_tx` whatever arrives through `hook`.
    pub fn new(host_tx: W, hook: H) -> Self {
        Self { host_tx, hook }
    }
}

impl<W, H> Proxy for ControllerToHost<W, H>
where
    W: AsyncWrite + Unpin + Send + 'static,
    H: DataReceivedHook,
{
    fn name(&self) -> &'static str {
        "controller-to-host"
    }

    fn register_listener(&mut self, acquirer: Acquirer) -> Result<()> {
        self.hook
            .set_data_received_handler(Box::new(move |chunk: &[u8]| {
                acquirer.acquire(&mut ChunkReader::new(chunk));
            }));
        Ok(())
    }

    fn transfer<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.host_tx.write_all(data).await?;
            self.host_tx.flush().await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::UnidirectionalProxy;
    use crate::transport::ControllerLink;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};

    #[tokio::test]
    async fn test_transfer_is_verbatim() {
        let (host_tx, mut host) = duplex(64);
        let mut proxy = ControllerToHost::new(host_tx, ControllerLink::new());

        proxy.transfer(&[0x04, 0x0E, 0x04]).await.unwrap();
        proxy.transfer(&[0x01, 0x03, 0x0C, 0x00]).await.unwrap();

        let mut buf = [0u8; 7];
        host.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x04, 0x0E, 0x04, 0x01, 0x03, 0x0C, 0x00]);
    }

    #[tokio::test]
    async fn test_registered_handler_acquires_chunks() {
        let (host_tx, mut host) = duplex(1024);
        let link = ControllerLink::new();
        let handle = UnidirectionalProxy::new(ControllerToHost::new(host_tx, link.clone()))
            .start()
            .unwrap();

        assert!(link.dispatch(&[0x04, 0x0F]));
        assert!(link.dispatch(&[]));
        assert!(link.dispatch(&[0x04, 0x00, 0x01, 0x02, 0x20]));

        let mut buf = [0u8; 7];
        tokio::time::timeout(Duration::from_secs(1), host.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(buf, [0x04, 0x0F, 0x04, 0x00, 0x01, 0x02, 0x20]);
        assert!(!handle.is_faulted());
    }
}
