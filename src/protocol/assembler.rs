//! Packet assembler for regrouping a host byte stream into whole packets.
//!
//! The controller transport only accepts complete packets, while the host
//! link delivers bytes split at arbitrary points. The assembler is a state
//! machine driven one step at a time:
//! - `AwaitingType`: consume the one-byte packet indicator
//! - `AwaitingHeader`: accumulate the fixed-length header, then decode the
//!   total packet length from it
//! - `AwaitingBody`: accumulate the rest of the packet
//!
//! When the body is complete the packet is emitted and the machine goes back
//! to `AwaitingType`. The output is identical however the input is split.
//!
//! # Example
//!
//! ```
//! use hci_bridge::protocol::{PacketAssembler, PacketType};
//!
//! let mut assembler = PacketAssembler::new();
//!
//! // HCI_Reset split across two reads
//! assert!(assembler.push(&[0x01, 0x03]).unwrap().is_empty());
//! let packets = assembler.push(&[0x0C, 0x00]).unwrap();
//!
//! assert_eq!(packets.len(), 1);
//! assert_eq!(packets[0].packet_type(), PacketType::Command);
//! assert_eq!(packets[0].data(), &[0x03, 0x0C, 0x00]);
//! ```

use bytes::BytesMut;

use super::packet::{Packet, PacketType, MAX_PACKET_SIZE};
use crate::error::{BridgeError, Result};

/// Smallest scratch allocation, to avoid many tiny reallocations.
pub const MIN_PACKET_ALLOC: usize = 16;

/// Externally visible assembler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    AwaitingType,
    AwaitingHeader,
    AwaitingBody,
}

#[derive(Debug, Clone, Copy)]
enum State {
    AwaitingType,
    AwaitingHeader(PacketType),
    AwaitingBody(PacketType),
}

/// Configuration for the packet assembler.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Largest total packet length (header + payload) accepted.
    pub max_packet_size: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

/// Owned scratch storage for the packet being accumulated.
///
/// Grows by allocating a fresh buffer and copying what was written so far.
/// [`take`](Self::take) hands the contents off as an immutable `Bytes` and
/// leaves an unallocated buffer behind, so the next packet never aliases a
/// delivered one.
#[derive(Debug, Default)]
pub struct PacketBuffer {
    data: BytesMut,
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make room for `required` bytes in total.
    pub fn reserve_total(&mut self, required: usize) {
        if self.data.capacity() >= required {
            return;
        }

        let size = required.max(MIN_PACKET_ALLOC);
        let mut fresh = BytesMut::with_capacity(size);
        fresh.extend_from_slice(&self.data);
        tracing::trace!(
            from = self.data.capacity(),
            to = fresh.capacity(),
            "growing packet buffer"
        );
        self.data = fresh;
    }

    #[inline]
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Move the accumulated bytes out, leaving an empty unallocated buffer.
    pub fn take(&mut self) -> bytes::Bytes {
        std::mem::take(&mut self.data).freeze()
    }

    pub fn clear(&mut self) {
        self.data = BytesMut::new();
    }
}

/// State machine turning an arbitrarily split byte stream into packets.
///
/// Invariant: `index <= length`. While awaiting the header, `length` is the
/// header length; afterwards it is the decoded total packet length.
pub struct PacketAssembler {
    state: State,
    buffer: PacketBuffer,
    /// Bytes of the current packet written so far.
    index: usize,
    /// Expected length of the current stage.
    length: usize,
    max_packet_size: usize,
}

impl PacketAssembler {
    /// Create an assembler accepting any packet the headers can describe.
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            state: State::AwaitingType,
            buffer: PacketBuffer::new(),
            index: 0,
            length: 0,
            max_packet_size: config.max_packet_size,
        }
    }

    /// Apply one state handler to the front of `input`.
    ///
    /// Consumed bytes are removed from `input`. Returns the packet if this
    /// step completed one. Callers loop until `input` is empty; a single
    /// input may complete zero, one or many packets.
    ///
    /// # Errors
    ///
    /// Unknown packet indicator, inconsistent header, or a packet larger
    /// than the configured maximum. These are framing faults: the stream
    /// position is no longer trustworthy.
    pub fn advance(&mut self, input: &mut &[u8]) -> Result<Option<Packet>> {
        if input.is_empty() {
            return Ok(None);
        }

        match self.state {
            State::AwaitingType => self.handle_packet_type(input)?,
            State::AwaitingHeader(packet_type) => self.handle_header(packet_type, input)?,
            State::AwaitingBody(_) => self.copy_packet_data(input),
        }

        Ok(self.take_complete_packet())
    }

    /// Feed a whole input and collect every packet it completes.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Packet>> {
        let mut input = data;
        let mut packets = Vec::new();

        while !input.is_empty() {
            if let Some(packet) = self.advance(&mut input)? {
                packets.push(packet);
            }
        }

        Ok(packets)
    }

    fn handle_packet_type(&mut self, input: &mut &[u8]) -> Result<()> {
        let indicator = input[0];
        *input = &input[1..];

        let packet_type = PacketType::from_indicator(indicator)?;
        self.index = 0;
        self.length = packet_type.header_len();
        self.state = State::AwaitingHeader(packet_type);
        Ok(())
    }

    fn handle_header(&mut self, packet_type: PacketType, input: &mut &[u8]) -> Result<()> {
        self.copy_packet_data(input);

        if self.index == self.length {
            let total = packet_type.decode_length(self.buffer.as_slice())?;
            if total > self.max_packet_size {
                return Err(BridgeError::PacketTooLarge {
                    length: total,
                    max: self.max_packet_size,
                });
            }
            self.length = total;
            self.state = State::AwaitingBody(packet_type);
        }
        Ok(())
    }

    /// Copy as much of `input` as the current stage still needs.
    fn copy_packet_data(&mut self, input: &mut &[u8]) {
        self.buffer.reserve_total(self.index + input.len());

        let step = input.len().min(self.length - self.index);
        self.buffer.append(&input[..step]);
        self.index += step;
        *input = &input[step..];
    }

    fn take_complete_packet(&mut self) -> Option<Packet> {
        let State::AwaitingBody(packet_type) = self.state else {
            return None;
        };
        if self.index != self.length {
            return None;
        }

        let packet = Packet::new(packet_type, self.buffer.take());
        self.state = State::AwaitingType;
        self.index = 0;
        self.length = 0;
        Some(packet)
    }

    /// Current state of the machine.
    pub fn state(&self) -> AssemblerState {
        match self.state {
            State::AwaitingType => AssemblerState::AwaitingType,
            State::AwaitingHeader(_) => AssemblerState::AwaitingHeader,
            State::AwaitingBody(_) => AssemblerState::AwaitingBody,
        }
    }

    /// Bytes of the current packet accumulated so far.
    pub fn bytes_written(&self) -> usize {
        self.index
    }

    /// Drop any partial packet and wait for a new indicator.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::AwaitingType;
        self.index = 0;
        self.length = 0;
    }
}

impl Default for PacketAssembler {
    fn default() -> Self {
        Self::new()
    }
}
