//! HCI packet types and H4 wire constants.
//!
//! Host-to-controller traffic carries two packet kinds, each prefixed on
//! the wire by a one-byte indicator:
//! ```text
//! Command   0x01 │ Opcode u16 LE │ Param len u8  │ Params...
//! ACL data  0x02 │ Handle u16 LE │ Data len u16 LE │ Data...
//! ```
//!
//! The indicator selects the header length; the length field at the end of
//! the header gives the number of bytes that follow it.

use bytes::Bytes;

use crate::error::{BridgeError, Result};

/// H4 indicator for HCI command packets.
pub const HCI_CMD_TYPE: u8 = 0x01;

/// H4 indicator for HCI ACL data packets.
pub const HCI_ACL_TYPE: u8 = 0x02;

/// Command header length: opcode (2) + parameter length (1).
pub const HCI_CMD_HDR_LEN: usize = 3;

/// ACL header length: handle/flags (2) + data length (2).
pub const HCI_ACL_HDR_LEN: usize = 4;

/// Largest packet either header can describe.
pub const MAX_PACKET_SIZE: usize = HCI_ACL_HDR_LEN + u16::MAX as usize;

/// Kind of packet, selected by the leading indicator byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// HCI command (kind A).
    Command,
    /// HCI ACL data (kind B).
    AclData,
}

impl PacketType {
    /// Map an H4 indicator to a packet type.
    pub fn from_indicator(indicator: u8) -> Result<Self> {
        match indicator {
            HCI_CMD_TYPE => Ok(PacketType::Command),
            HCI_ACL_TYPE => Ok(PacketType::AclData),
            other => Err(BridgeError::UnknownPacketType(other)),
        }
    }

    /// H4 indicator byte for this packet type.
    #[inline]
    pub fn indicator(self) -> u8 {
        match self {
            PacketType::Command => HCI_CMD_TYPE,
            PacketType::AclData => HCI_ACL_TYPE,
        }
    }

    /// Fixed header length for this packet type.
    #[inline]
    pub fn header_len(self) -> usize {
        match self {
            PacketType::Command => HCI_CMD_HDR_LEN,
            PacketType::AclData => HCI_ACL_HDR_LEN,
        }
    }

    /// Decode the total packet length (header + payload) from a complete header.
    ///
    /// Fails if `header` is not exactly [`header_len`](Self::header_len) bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use hci_bridge::protocol::PacketType;
    ///
    /// // HCI_Reset: opcode 0x0C03, no parameters
    /// assert_eq!(PacketType::Command.decode_length(&[0x03, 0x0C, 0x00]).unwrap(), 3);
    /// // ACL on handle 0x0040 carrying 0x0102 bytes
    /// assert_eq!(PacketType::AclData.decode_length(&[0x40, 0x00, 0x02, 0x01]).unwrap(), 4 + 0x0102);
    /// ```
    pub fn decode_length(self, header: &[u8]) -> Result<usize> {
        let expected = self.header_len();
        if header.len() != expected {
            return Err(BridgeError::InvalidHeaderLength {
                packet_type: self,
                expected,
                actual: header.len(),
            });
        }

        let payload_len = match self {
            PacketType::Command => header[HCI_CMD_HDR_LEN - 1] as usize,
            PacketType::AclData => {
                u16::from_le_bytes([header[HCI_ACL_HDR_LEN - 2], header[HCI_ACL_HDR_LEN - 1]])
                    as usize
            }
        };

        Ok(expected + payload_len)
    }
}

/// A complete packet: header followed by payload, without the indicator.
///
/// This is what the controller transport receives. The bytes are an owned,
/// immutable handle; once delivered nothing else refers to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    packet_type: PacketType,
    data: Bytes,
}

impl Packet {
    /// Create a packet from its type and header+payload bytes.
    pub fn new(packet_type: PacketType, data: Bytes) -> Self {
        Self { packet_type, data }
    }

    #[inline]
    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    /// Total length: header + payload.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes this packet occupies on the H4 wire, indicator included.
    #[inline]
    pub fn wire_len(&self) -> usize {
        1 + self.data.len()
    }

    /// Header bytes.
    pub fn header(&self) -> &[u8] {
        let end = self.packet_type.header_len().min(self.data.len());
        &self.data[..end]
    }

    /// Payload bytes following the header.
    pub fn payload(&self) -> &[u8] {
        let start = self.packet_type.header_len().min(self.data.len());
        &self.data[start..]
    }

    /// Header and payload as one slice.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Release the packet bytes.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

/// Build the H4 byte sequence of an HCI command.
///
/// # Panics
///
/// Panics if `params` is longer than 255 bytes.
pub fn encode_command(opcode: u16, params: &[u8]) -> Vec<u8> {
    let param_len = u8::try_from(params.len()).expect("command parameters exceed 255 bytes");
    let mut out = Vec::with_capacity(1 + HCI_CMD_HDR_LEN + params.len());
    out.push(HCI_CMD_TYPE);
    out.extend_from_slice(&opcode.to_le_bytes());
    out.push(param_len);
    out.extend_from_slice(params);
    out
}

/// Build the H4 byte sequence of an ACL data packet.
///
/// # Panics
///
/// Panics if `data` is longer than 65535 bytes.
pub fn encode_acl(handle: u16, data: &[u8]) -> Vec<u8> {
    let data_len = u16::try_from(data.len()).expect("ACL data exceeds 65535 bytes");
    let mut out = Vec::with_capacity(1 + HCI_ACL_HDR_LEN + data.len());
    out.push(HCI_ACL_TYPE);
    out.extend_from_slice(&handle.to_le_bytes());
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(data);
    out
}
