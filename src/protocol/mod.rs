//! Protocol module - HCI packet types and stream reassembly.
//!
//! This module implements the host-to-controller framing:
//! - H4 indicators and fixed header lengths
//! - Packet struct with typed accessors
//! - Assembler state machine for regrouping split input into packets

mod assembler;
mod packet;

pub use assembler::{
    AssemblerConfig, AssemblerState, PacketAssembler, PacketBuffer, MIN_PACKET_ALLOC,
};
pub use packet::{
    encode_acl, encode_command, Packet, PacketType, HCI_ACL_HDR_LEN, HCI_ACL_TYPE,
    HCI_CMD_HDR_LEN, HCI_CMD_TYPE, MAX_PACKET_SIZE,
};
