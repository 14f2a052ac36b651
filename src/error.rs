//! Error types for hci-bridge.

use thiserror::Error;

use crate::protocol::PacketType;

/// Main error type for all bridge operations.
///
/// Every variant is terminal for the proxy that produced it: once a proxy
/// task returns one of these it never processes another byte.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// I/O error on the host link or the controller stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The producer could not enqueue more bytes; the stream lost data.
    #[error("Reception buffer overflow (capacity {capacity} bytes)")]
    BufferOverflow { capacity: usize },

    /// Leading packet indicator matches neither command nor ACL data.
    #[error("Unknown packet type: {0:#04x}")]
    UnknownPacketType(u8),

    /// Accumulated header does not have the length its packet type requires.
    #[error("Invalid {packet_type:?} header length: expected {expected}, got {actual}")]
    InvalidHeaderLength {
        packet_type: PacketType,
        expected: usize,
        actual: usize,
    },

    /// Declared packet length exceeds the assembler limit.
    #[error("Packet length {length} exceeds maximum {max}")]
    PacketTooLarge { length: usize, max: usize },

    /// Controller transport is gone.
    #[error("Controller transport closed")]
    TransportClosed,

    /// Invalid startup configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A proxy task panicked or was cancelled.
    #[error("Proxy task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BridgeError {
    /// Returns true for faults that mean the byte stream lost synchronization
    /// (overflow or framing), as opposed to a failing link.
    pub fn is_stream_fault(&self) -> bool {
        matches!(
            self,
            BridgeError::BufferOverflow { .. }
                | BridgeError::UnknownPacketType(_)
                | BridgeError::InvalidHeaderLength { .. }
                | BridgeError::PacketTooLarge { .. }
        )
    }
}

/// Result type alias using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;
