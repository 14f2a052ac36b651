//! # hci-bridge
//!
//! Bridges a host serial link to a Bluetooth LE controller transport.
//!
//! Two independent proxies move data in each direction:
//!
//! - **Host → Controller**: bytes from the host are regrouped into whole HCI
//!   command and ACL data packets, each written to the controller on its own
//! - **Controller → Host**: chunks from the controller are forwarded
//!   verbatim
//!
//! Both run on the same engine, [`UnidirectionalProxy`]: a non-blocking
//! producer appends into a bounded buffer, and a dedicated task drains it in
//! small windows. Buffer overflow and malformed packets are terminal faults.
//!
//! ## Example
//!
//! ```ignore
//! use hci_bridge::{ControllerLink, ControllerToHost, HostToController, UnidirectionalProxy};
//! use hci_bridge::transport::H4Transport;
//!
//! let link = ControllerLink::new();
//! let h2c = UnidirectionalProxy::new(
//!     HostToController::new(H4Transport::new(controller_tx)).with_host_rx(std::io::stdin()),
//! )
//! .start()?;
//! let c2h = UnidirectionalProxy::new(ControllerToHost::new(tokio::io::stdout(), link.clone()))
//!     .start()?;
//! link.spawn_reader(controller_rx);
//! ```

pub mod buffer;
pub mod config;
pub mod controller_to_host;
pub mod error;
pub mod host_to_controller;
pub mod protocol;
pub mod proxy;
pub mod reader;
pub mod signal;
pub mod transport;

pub use config::BridgeConfig;
pub use controller_to_host::ControllerToHost;
pub use error::{BridgeError, Result};
pub use host_to_controller::HostToController;
pub use protocol::{Packet, PacketAssembler, PacketType};
pub use proxy::{Acquirer, Proxy, ProxyConfig, ProxyHandle, UnidirectionalProxy};
pub use transport::{ControllerLink, ControllerTransport, DataReceivedHook, H4Transport};
