//! Edge-triggered notification register between producer and consumer.
//!
//! A small set of independent flags. Setting a flag is lock-free and never
//! blocks, so it is safe from any thread; waiting is async and only done by
//! the single consumer task.

use std::sync::atomic::{AtomicU32, Ordering};

use tokio::sync::Notify;

/// Bytes were appended to the reception buffer.
pub const DATA_AVAILABLE: u32 = 1 << 0;

/// The producer could not append; data was lost.
pub const RECEPTION_ERROR: u32 = 1 << 1;

/// Flags the consumer wakes up for.
pub const WAITING_FLAGS: u32 = DATA_AVAILABLE | RECEPTION_ERROR;

/// Set of event flags with an async wait.
#[derive(Debug, Default)]
pub struct EventFlags {
    bits: AtomicU32,
    notify: Notify,
}

impl EventFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current flags.
    #[inline]
    pub fn get(&self) -> u32 {
        self.bits.load(Ordering::Acquire)
    }

    /// Raise `flags`. Returns the previous value.
    ///
    /// The waiter is only notified when at least one flag goes from clear
    /// to set; raising an already set flag is a no-op.
    pub fn set(&self, flags: u32) -> u32 {
        let previous = self.bits.fetch_or(flags, Ordering::AcqRel);
        if previous & flags != flags {
            self.notify.notify_one();
        }
        previous
    }

    /// Clear `flags`. Returns the previous value.
    pub fn clear(&self, flags: u32) -> u32 {
        self.bits.fetch_and(!flags, Ordering::AcqRel)
    }

    /// Wait until any flag in `mask` is set, without clearing it.
    pub async fn wait_any(&self, mask: u32) -> u32 {
        loop {
            let flags = self.get();
            if flags & mask != 0 {
                return flags;
            }
            // A notification sent before this point is kept as a permit,
            // so a set between the check and the await is not lost.
            self.notify.notified().await;
        }
    }
}
