//! Unidirectional proxy engine.
//!
//! Decouples data acquisition, which happens in a callback context that
//! must never block, from data transfer, which runs on a dedicated task and
//! may block on I/O for as long as it needs.
//!
//! # Architecture
//!
//! ```text
//! RX callback ─► Acquirer::acquire ─► RingBuffer ─► proxy task ─► Proxy::transfer
//!                        │                              ▲
//!                        └──────── EventFlags ──────────┘
//! ```
//!
//! The producer drains a [`Reader`] into the bounded buffer and raises
//! `DATA_AVAILABLE`. The consumer pops a small window at a time under a
//! short lock and hands it to the direction-specific sink. If the buffer
//! overflows the producer raises `RECEPTION_ERROR`, and the consumer stops
//! for good: past that point the byte stream cannot be trusted.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use crate::buffer::RingBuffer;
use crate::error::{BridgeError, Result};
use crate::reader::{Reader, Unit};
use crate::signal::{EventFlags, DATA_AVAILABLE, RECEPTION_ERROR, WAITING_FLAGS};

/// Default reception buffer capacity in bytes.
pub const CIRCULAR_BUFFER_LENGTH: usize = 8192;

/// Default number of bytes popped per transfer.
pub const CONSUMER_BUFFER_LENGTH: usize = 32;

/// Boxed future returned by [`Proxy::transfer`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Hook invoked once when a proxy reaches its terminal fault.
pub type FaultHook = Arc<dyn Fn(&BridgeError) + Send + Sync>;

/// Direction-specific behaviour plugged into the engine.
pub trait Proxy: Send + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        "proxy"
    }

    /// Hook the proxy up to its data source.
    ///
    /// Called exactly once, by [`UnidirectionalProxy::start`]. The data
    /// handler installed here must call [`Acquirer::acquire`] whenever new
    /// data is ready.
    fn register_listener(&mut self, acquirer: Acquirer) -> Result<()>;

    /// Transfer a window of received bytes to the destination.
    ///
    /// Any error is terminal for the proxy.
    fn transfer<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<()>>;
}

/// Configuration for a proxy engine.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Reception buffer capacity.
    pub buffer_capacity: usize,
    /// Maximum bytes handed to `transfer` per call.
    pub window_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: CIRCULAR_BUFFER_LENGTH,
            window_size: CONSUMER_BUFFER_LENGTH,
        }
    }
}

/// State shared between the producer callback and the proxy task.
#[derive(Debug)]
struct Shared {
    rx_buffer: Mutex<RingBuffer>,
    signal_channel: EventFlags,
    faulted: AtomicBool,
    capacity: usize,
}

impl Shared {
    fn lock_buffer(&self) -> MutexGuard<'_, RingBuffer> {
        // The guarded section never panics, so a poisoned lock still holds
        // consistent data.
        self.rx_buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pop(&self, window: &mut [u8]) -> usize {
        self.lock_buffer().pop(window)
    }

    fn signal_data_available(&self) {
        self.signal_channel.set(DATA_AVAILABLE);
    }

    fn signal_reception_error(&self) {
        self.signal_channel.set(RECEPTION_ERROR);
    }

    fn reception_error(&self) -> bool {
        self.signal_channel.get() & RECEPTION_ERROR != 0
    }

    /// Block until the producer signals data or an error.
    async fn wait_for_data(&self) {
        self.signal_channel.clear(DATA_AVAILABLE);

        // Bytes pushed between the empty pop and the clear above would
        // otherwise sit in the buffer until the next acquisition.
        if !self.lock_buffer().is_empty() {
            return;
        }

        self.signal_channel.wait_any(WAITING_FLAGS).await;
    }
}

/// Producer-side handle: appends received data to a proxy's buffer.
///
/// Cheap to clone. [`acquire`](Self::acquire) never awaits, so it can be
/// called from a plain OS thread or a driver callback.
#[derive(Debug, Clone)]
pub struct Acquirer {
    shared: Arc<Shared>,
}

impl Acquirer {
    /// Drain `reader` into the reception buffer.
    ///
    /// Returns immediately if the reader has nothing. If the buffer fills
    /// up, reception error is signalled and draining stops at once; units
    /// already taken from the reader are lost.
    pub fn acquire<R: Reader>(&self, reader: &mut R) {
        if !reader.ready() {
            return;
        }

        {
            let mut rx_buffer = self.shared.lock_buffer();
            while reader.ready() {
                if !reader.read().push_into(&mut rx_buffer) {
                    drop(rx_buffer);
                    tracing::warn!(
                        capacity = self.shared.capacity,
                        "reception buffer full, data lost"
                    );
                    self.shared.signal_reception_error();
                    return;
                }
            }
        }

        self.shared.signal_data_available();
    }

    /// Whether reception error has been signalled.
    pub fn reception_error(&self) -> bool {
        self.shared.reception_error()
    }

    /// Whether the proxy task has stopped on a terminal fault.
    pub fn is_faulted(&self) -> bool {
        self.shared.faulted.load(Ordering::Acquire)
    }

    /// Bytes waiting to be transferred.
    pub fn pending(&self) -> usize {
        self.shared.lock_buffer().len()
    }
}

/// Engine moving data from one end point to another through a bounded
/// buffer and a dedicated task.
///
/// # Example
///
/// ```ignore
/// use hci_bridge::proxy::UnidirectionalProxy;
///
/// let handle = UnidirectionalProxy::new(my_proxy).start()?;
/// let fault = handle.wait().await;
/// ```
pub struct UnidirectionalProxy<P: Proxy> {
    proxy: P,
    shared: Arc<Shared>,
    window_size: usize,
    fault_hook: Option<FaultHook>,
}

impl<P: Proxy> UnidirectionalProxy<P> {
    /// Create a proxy engine with default buffer sizes.
    pub fn new(proxy: P) -> Self {
        Self::with_config(proxy, ProxyConfig::default())
    }

    pub fn with_config(proxy: P, config: ProxyConfig) -> Self {
        let shared = Arc::new(Shared {
            rx_buffer: Mutex::new(RingBuffer::new(config.buffer_capacity)),
            signal_channel: EventFlags::new(),
            faulted: AtomicBool::new(false),
            capacity: config.buffer_capacity,
        });

        Self {
            proxy,
            shared,
            window_size: config.window_size.max(1),
            fault_hook: None,
        }
    }

    /// Install the hook run when the proxy reaches its terminal fault.
    pub fn with_fault_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&BridgeError) + Send + Sync + 'static,
    {
        self.fault_hook = Some(Arc::new(hook));
        self
    }

    /// Producer handle for this proxy.
    pub fn acquirer(&self) -> Acquirer {
        Acquirer {
            shared: self.shared.clone(),
        }
    }

    /// Register the data listener and spawn the transfer task.
    ///
    /// Must be called from within a tokio runtime. Consumes the engine, so
    /// it can only be started once.
    pub fn start(mut self) -> Result<ProxyHandle> {
        let name = self.proxy.name();
        let acquirer = self.acquirer();

        self.proxy.register_listener(acquirer.clone())?;
        tracing::debug!(proxy = name, window = self.window_size, "proxy started");

        let task = tokio::spawn(run(
            self.proxy,
            self.shared,
            self.window_size,
            self.fault_hook,
        ));

        Ok(ProxyHandle {
            name,
            acquirer,
            task,
        })
    }
}

/// Transfer task body. Only returns on terminal fault.
async fn run<P: Proxy>(
    mut proxy: P,
    shared: Arc<Shared>,
    window_size: usize,
    fault_hook: Option<FaultHook>,
) -> Result<()> {
    let result = transfer_loop(&mut proxy, &shared, window_size).await;

    if let Err(e) = &result {
        shared.faulted.store(true, Ordering::Release);
        tracing::error!(proxy = proxy.name(), error = %e, "proxy halted on fatal error");
        if let Some(hook) = fault_hook {
            hook(e);
        }
    }

    result
}

async fn transfer_loop<P: Proxy>(proxy: &mut P, shared: &Shared, window_size: usize) -> Result<()> {
    let mut window = vec![0u8; window_size];

    loop {
        if shared.reception_error() {
            return Err(BridgeError::BufferOverflow {
                capacity: shared.capacity,
            });
        }

        let length = shared.pop(&mut window);

        if length == 0 {
            shared.wait_for_data().await;
        } else {
            tracing::trace!(proxy = proxy.name(), length, "transferring window");
            proxy.transfer(&window[..length]).await?;
        }
    }
}

/// Handle to a started proxy.
pub struct ProxyHandle {
    name: &'static str,
    acquirer: Acquirer,
    task: JoinHandle<Result<()>>,
}

impl ProxyHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Producer handle for the running proxy.
    pub fn acquirer(&self) -> &Acquirer {
        &self.acquirer
    }

    /// Whether the proxy has stopped on a terminal fault.
    pub fn is_faulted(&self) -> bool {
        self.acquirer.is_faulted()
    }

    /// Wait for the proxy task to end, yielding the fault that stopped it.
    pub async fn wait(self) -> Result<()> {
        self.task.await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{ByteReader, ChunkReader};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Proxy forwarding every window over a channel.
    struct Recorder {
        tx: mpsc::UnboundedSender<Vec<u8>>,
        registered: Arc<AtomicUsize>,
    }

    impl Proxy for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn register_listener(&mut self, _acquirer: Acquirer) -> Result<()> {
            self.registered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn transfer<'a>(&'a mut self, data: &'a [u8]) -> BoxFuture<'a, Result<()>> {
            Box::pin(async move {
                self.tx
                    .send(data.to_vec())
                    .map_err(|_| BridgeError::TransportClosed)
            })
        }
    }

    fn recorder() -> (Recorder, mpsc::UnboundedReceiver<Vec<u8>>, Arc<AtomicUsize>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let registered = Arc::new(AtomicUsize::new(0));
        let proxy = Recorder {
            tx,
            registered: registered.clone(),
        };
        (proxy, rx, registered)
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>, expected: usize) -> Vec<u8> {
        let mut out = Vec::new();
        while out.len() < expected {
            let window = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            out.extend(window);
        }
        out
    }

    #[test]
    fn test_config_default() {
        let config = ProxyConfig::default();
        assert_eq!(config.buffer_capacity, CIRCULAR_BUFFER_LENGTH);
        assert_eq!(config.window_size, CONSUMER_BUFFER_LENGTH);
    }

    #[test]
    fn test_acquire_empty_reader_is_noop() {
        let (proxy, _rx, _) = recorder();
        let engine = UnidirectionalProxy::new(proxy);
        let acquirer = engine.acquirer();

        acquirer.acquire(&mut ByteReader::new(&[]));

        assert_eq!(acquirer.pending(), 0);
        assert_eq!(engine.shared.signal_channel.get(), 0);
    }

    #[test]
    fn test_acquire_signals_data_available() {
        let (proxy, _rx, _) = recorder();
        let engine = UnidirectionalProxy::new(proxy);
        let acquirer = engine.acquirer();

        acquirer.acquire(&mut ByteReader::new(&[1, 2, 3]));
        acquirer.acquire(&mut ChunkReader::new(&[4, 5]));

        assert_eq!(acquirer.pending(), 5);
        assert_eq!(engine.shared.signal_channel.get(), DATA_AVAILABLE);
    }

    #[test]
    fn test_overflow_stops_draining() {
        let (proxy, _rx, _) = recorder();
        let engine = UnidirectionalProxy::with_config(
            proxy,
            ProxyConfig {
                buffer_capacity: 4,
                window_size: 2,
            },
        );
        let acquirer = engine.acquirer();

        let data = [1, 2, 3, 4, 5, 6, 7];
        let mut reader = ByteReader::new(&data);
        acquirer.acquire(&mut reader);

        // Fifth byte was taken and lost, the rest stays in the reader
        assert_eq!(reader.remaining(), 2);
        assert_eq!(acquirer.pending(), 4);
        assert!(acquirer.reception_error());
        assert_eq!(engine.shared.signal_channel.get() & DATA_AVAILABLE, 0);
    }

    #[tokio::test]
    async fn test_start_registers_listener_once() {
        let (proxy, _rx, registered) = recorder();

        let handle = UnidirectionalProxy::new(proxy).start().unwrap();

        assert_eq!(registered.load(Ordering::SeqCst), 1);
        assert_eq!(handle.name(), "recorder");
        assert!(!handle.is_faulted());
    }

    #[tokio::test]
    async fn test_transfers_in_windows_and_order() {
        let (proxy, mut rx, _) = recorder();
        let handle = UnidirectionalProxy::new(proxy).start().unwrap();

        let data: Vec<u8> = (0..100).collect();
        handle.acquirer().acquire(&mut ByteReader::new(&data));

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(first.len() <= CONSUMER_BUFFER_LENGTH);

        let mut received = first;
        received.extend(collect(&mut rx, data.len() - received.len()).await);
        assert_eq!(received, data);
    }

    #[tokio::test]
    async fn test_wakes_for_later_batches() {
        let (proxy, mut rx, _) = recorder();
        let handle = UnidirectionalProxy::new(proxy).start().unwrap();
        let acquirer = handle.acquirer().clone();

        for batch in 0..5u8 {
            let producer = acquirer.clone();
            std::thread::spawn(move || {
                producer.acquire(&mut ChunkReader::new(&[batch, batch]));
            })
            .join()
            .unwrap();

            let received = collect(&mut rx, 2).await;
            assert_eq!(received, vec![batch, batch]);
        }
    }

    #[tokio::test]
    async fn test_overflow_is_terminal() {
        let (proxy, mut rx, _) = recorder();
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let hook_counter = hook_calls.clone();

        let engine = UnidirectionalProxy::with_config(
            proxy,
            ProxyConfig {
                buffer_capacity: 8,
                window_size: 4,
            },
        )
        .with_fault_hook(move |e| {
            assert!(e.is_stream_fault());
            hook_counter.fetch_add(1, Ordering::SeqCst);
        });

        // Overflow before the consumer ever runs
        engine.acquirer().acquire(&mut ByteReader::new(&[0u8; 12]));
        let handle = engine.start().unwrap();
        let acquirer = handle.acquirer().clone();

        let result = tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .unwrap();
        assert!(matches!(result, Err(BridgeError::BufferOverflow { capacity: 8 })));
        assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
        assert!(acquirer.is_faulted());

        // Nothing was transferred, and later data is never processed
        acquirer.acquire(&mut ByteReader::new(&[1, 2, 3]));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transfer_error_is_terminal() {
        let (proxy, rx, _) = recorder();
        drop(rx);

        let handle = UnidirectionalProxy::new(proxy).start().unwrap();
        handle.acquirer().acquire(&mut ByteReader::new(&[1]));

        let result = tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .unwrap();
        assert!(matches!(result, Err(BridgeError::TransportClosed)));
    }
}
