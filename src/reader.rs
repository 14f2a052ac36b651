//! Readers: transient views over freshly received data.
//!
//! A reader is built by the hardware-side callback, drained once by
//! [`Acquirer::acquire`](crate::proxy::Acquirer::acquire) and dropped. It
//! yields units that are appended to the reception buffer: single bytes
//! for the host serial link, whole chunks for the controller.

use crate::buffer::RingBuffer;

/// Something that can be appended to the reception buffer.
pub trait Unit {
    /// Append to `buffer`. Returns `false`, leaving `buffer` untouched, if
    /// there is not enough space.
    fn push_into(self, buffer: &mut RingBuffer) -> bool;
}

impl Unit for u8 {
    #[inline]
    fn push_into(self, buffer: &mut RingBuffer) -> bool {
        buffer.push(self)
    }
}

impl Unit for &[u8] {
    #[inline]
    fn push_into(self, buffer: &mut RingBuffer) -> bool {
        buffer.push_slice(self)
    }
}

/// Source of received units.
pub trait Reader {
    type Unit: Unit;

    /// Whether another unit can be read.
    fn ready(&self) -> bool;

    /// Take the next unit. Only valid while [`ready`](Self::ready) is true.
    fn read(&mut self) -> Self::Unit;
}

/// Yields received bytes one at a time.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl Reader for ByteReader<'_> {
    type Unit = u8;

    #[inline]
    fn ready(&self) -> bool {
        self.position < self.data.len()
    }

    /// # Panics
    ///
    /// Panics if called when not ready.
    #[inline]
    fn read(&mut self) -> u8 {
        let byte = self.data[self.position];
        self.position += 1;
        byte
    }
}

/// Yields one already-delimited chunk, exactly once.
///
/// The chunk borrows memory owned by the caller and is only valid for the
/// duration of the acquisition.
#[derive(Debug)]
pub struct ChunkReader<'a> {
    chunk: &'a [u8],
    taken: bool,
}

impl<'a> ChunkReader<'a> {
    pub fn new(chunk: &'a [u8]) -> Self {
        Self {
            chunk,
            taken: false,
        }
    }
}

impl<'a> Reader for ChunkReader<'a> {
    type Unit = &'a [u8];

    #[inline]
    fn ready(&self) -> bool {
        !self.taken
    }

    #[inline]
    fn read(&mut self) -> &'a [u8] {
        self.taken = true;
        self.chunk
    }
}
