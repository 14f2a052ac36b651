//! Bounded circular byte buffer shared between producer and consumer.
//!
//! Appends never overwrite and never grow the storage: a push that does not
//! fit fails and leaves the buffer untouched. Callers serialize access
//! (see [`UnidirectionalProxy`](crate::proxy::UnidirectionalProxy)).

/// Fixed-capacity FIFO of bytes.
#[derive(Debug)]
pub struct RingBuffer {
    storage: Box<[u8]>,
    /// Index of the oldest byte.
    head: usize,
    /// Number of bytes stored.
    len: usize,
}

impl RingBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Free space in bytes.
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity() - self.len
    }

    /// Append one byte. Returns `false` if the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        let tail = (self.head + self.len) % self.capacity();
        self.storage[tail] = byte;
        self.len += 1;
        true
    }

    /// Append a whole slice, or nothing if it does not fit.
    pub fn push_slice(&mut self, data: &[u8]) -> bool {
        if data.len() > self.available() {
            return false;
        }
        if data.is_empty() {
            return true;
        }

        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        let first = data.len().min(capacity - tail);
        self.storage[tail..tail + first].copy_from_slice(&data[..first]);
        self.storage[..data.len() - first].copy_from_slice(&data[first..]);
        self.len += data.len();
        true
    }

    /// Move up to `out.len()` of the oldest bytes into `out`.
    ///
    /// Returns the number of bytes written to `out`.
    pub fn pop(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.len);
        if count == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = count.min(capacity - self.head);
        out[..first].copy_from_slice(&self.storage[self.head..self.head + first]);
        out[first..count].copy_from_slice(&self.storage[..count - first]);

        self.head = (self.head + count) % capacity;
        self.len -= count;
        count
    }

    /// Discard all stored bytes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_fifo_order() {
        let mut ring = RingBuffer::new(8);
        for b in 1..=5 {
            assert!(ring.push(b));
        }

        let mut out = [0u8; 3];
        assert_eq!(ring.pop(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(ring.len(), 2);

        let mut out = [0u8; 8];
        assert_eq!(ring.pop(&mut out), 2);
        assert_eq!(&out[..2], &[4, 5]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_push_fails_when_full() {
        let mut ring = RingBuffer::new(4);
        assert!(ring.push_slice(&[1, 2, 3, 4]));
        assert!(ring.is_full());
        assert!(!ring.push(5));
        assert!(!ring.push_slice(&[5]));
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_push_slice_is_all_or_nothing() {
        let mut ring = RingBuffer::new(4);
        assert!(ring.push_slice(&[1, 2, 3]));
        assert!(!ring.push_slice(&[4, 5]));
        assert_eq!(ring.len(), 3);

        // Empty chunks always fit, even into a full buffer
        assert!(ring.push(4));
        assert!(ring.push_slice(&[]));
    }

    #[test]
    fn test_wrap_around() {
        let mut ring = RingBuffer::new(5);
        let mut out = [0u8; 5];

        assert!(ring.push_slice(&[1, 2, 3, 4]));
        assert_eq!(ring.pop(&mut out[..3]), 3);

        // Tail wraps past the end of storage
        assert!(ring.push_slice(&[5, 6, 7, 8]));
        assert!(ring.is_full());

        assert_eq!(ring.pop(&mut out), 5);
        assert_eq!(out, [4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_pop_empty() {
        let mut ring = RingBuffer::new(4);
        let mut out = [0u8; 4];
        assert_eq!(ring.pop(&mut out), 0);
    }

    #[test]
    fn test_clear() {
        let mut ring = RingBuffer::new(4);
        ring.push_slice(&[1, 2, 3]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.available(), 4);
    }
}
