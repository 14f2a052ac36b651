//! Proxy transferring data from the host to the controller.
//!
//! Bytes arrive one at a time from the host serial link. The controller
//! transport expects whole packets, so transferred windows are regrouped by
//! a [`PacketAssembler`] and each completed packet is written on its own.

use std::io::{ErrorKind, Read};

use crate::error::Result;
use crate::protocol::PacketAssembler;
use crate::proxy::{Acquirer, BoxFuture, Proxy};
use crate::reader::ByteReader;
use crate::transport::ControllerTransport;

/// Bytes read from the host link per blocking read.
pub const HOST_RX_CHUNK: usize = 64;

/// Host-to-controller direction.
pub struct HostToController<T> {
    transport: T,
    assembler: PacketAssembler,
    host_rx: Option<Box<dyn Read + Send>>,
}

impl<T: ControllerTransport> HostToController<T> {
    /// Create a proxy writing packets to `transport`.
    ///
    /// Without [`with_host_rx`](Self::with_host_rx) nothing is registered at
    /// start; data is fed through the proxy's `Acquirer` directly.
    pub fn new(transport: T) -> Self {
        Self::with_assembler(transport, PacketAssembler::new())
    }

    pub fn with_assembler(transport: T, assembler: PacketAssembler) -> Self {
        Self {
            transport,
            assembler,
            host_rx: None,
        }
    }

    /// Use `host_rx` as the host serial receive line.
    ///
    /// On start a dedicated thread performs blocking reads on it and
    /// acquires every byte read.
    pub fn with_host_rx<R>(mut self, host_rx: R) -> Self
    where
        R: Read + Send + 'static,
    {
        self.host_rx = Some(Box::new(host_rx));
        self
    }
}

impl<T: ControllerTransport> Proxy for HostToController<T> {
    fn name(&self) -> &'static str {
        "host-to-controller"
    }

    fn register_listener(&mut self, acquirer: Acquirer) -> Result<()> {
        if let Some(host_rx) = self.host_rx.take() {
            std::thread::Builder::new()
                .name("host-rx".to_string())
                .spawn(move || host_rx_loop(host_rx, acquirer))?;
        }
        Ok(())
    }

    fn transfer<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // A window may complete zero, one or many packets
            let mut input = data;
            while !input.is_empty() {
                if let Some(packet) = self.assembler.advance(&mut input)? {
                    tracing::debug!(
                        packet_type = ?packet.packet_type(),
                        len = packet.len(),
                        "packet to controller"
                    );
                    self.transport.write(packet).await?;
                }
            }
            Ok(())
        })
    }
}

/// Receive loop of the host link, standing in for the serial RX interrupt.
fn host_rx_loop(mut host_rx: Box<dyn Read + Send>, acquirer: Acquirer) {
    let mut buf = [0u8; HOST_RX_CHUNK];

    loop {
        match host_rx.read(&mut buf) {
            Ok(0) => {
                tracing::info!("host link closed");
                return;
            }
            Ok(n) => acquirer.acquire(&mut ByteReader::new(&buf[..n])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::error!(error = %e, "host link read failed");
                return;
            }
        }

        if acquirer.reception_error() || acquirer.is_faulted() {
            tracing::debug!("host link reader stopping after fault");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::protocol::{encode_acl, encode_command, Packet, PacketType};
    use crate::proxy::UnidirectionalProxy;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Transport recording each packet written.
    struct ChannelTransport {
        tx: mpsc::UnboundedSender<Packet>,
    }

    impl ControllerTransport for ChannelTransport {
        fn write(&mut self, packet: Packet) -> BoxFuture<'_, Result<()>> {
            let result = self
                .tx
                .send(packet)
                .map_err(|_| BridgeError::TransportClosed);
            Box::pin(async move { result })
        }
    }

    fn proxy() -> (HostToController<ChannelTransport>, mpsc::UnboundedReceiver<Packet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (HostToController::new(ChannelTransport { tx }), rx)
    }

    async fn next_packet(rx: &mut mpsc::UnboundedReceiver<Packet>) -> Packet {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_transfer_delivers_packets_in_order() {
        let (mut proxy, mut rx) = proxy();
        let mut window = encode_command(0x0C03, &[]);
        window.extend(encode_command(0x1001, &[]));

        proxy.transfer(&window).await.unwrap();

        assert_eq!(next_packet(&mut rx).await.header(), &[0x03, 0x0C, 0x00]);
        assert_eq!(next_packet(&mut rx).await.header(), &[0x01, 0x10, 0x00]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transfer_packet_spanning_windows() {
        let (mut proxy, mut rx) = proxy();
        let bytes = encode_acl(0x0040, &[0x5A; 70]);

        for window in bytes.chunks(32) {
            proxy.transfer(window).await.unwrap();
        }

        let packet = next_packet(&mut rx).await;
        assert_eq!(packet.packet_type(), PacketType::AclData);
        assert_eq!(packet.len(), 74);
    }

    #[tokio::test]
    async fn test_transfer_unknown_type_fails() {
        let (mut proxy, mut rx) = proxy();

        let result = proxy.transfer(&[0x09, 0x00]).await;

        assert!(matches!(result, Err(BridgeError::UnknownPacketType(0x09))));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_host_rx_thread_feeds_proxy() {
        let (proxy, mut rx) = proxy();
        let mut stream = encode_command(0x0C03, &[]);
        stream.extend(encode_acl(0x0001, b"abc"));

        let proxy = proxy.with_host_rx(std::io::Cursor::new(stream));
        let _handle = UnidirectionalProxy::new(proxy).start().unwrap();

        assert_eq!(next_packet(&mut rx).await.packet_type(), PacketType::Command);
        let acl = next_packet(&mut rx).await;
        assert_eq!(acl.payload(), b"abc");
    }
}
