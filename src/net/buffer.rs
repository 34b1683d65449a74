//! net/buffer.rs
//!
//! Growable byte accumulator used for both directions of a connection.
//! Capacity only ever grows: it doubles when short, or jumps straight to the
//! requested size when doubling would not be enough. The live bytes always
//! start at offset 0.

use std::collections::TryReserveError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

/// First allocation size for a buffer that has never held anything.
pub const INITIAL_CAPACITY: usize = 1024;

// -----------------------------------------------------------------------------
// ----- Buffer ----------------------------------------------------------------

#[derive(Debug, Default)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    #[cfg(test)]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Buffer: Public Methods ------------------------------------------------

impl Buffer {
    /// Ensure `capacity() >= min_capacity`.
    ///
    /// Growth is doubling, except that a request larger than twice the current
    /// capacity is satisfied exactly. Only fails when the allocator does.
    pub fn reserve(&mut self, min_capacity: usize) -> Result<(), TryReserveError> {
        let capacity = self.data.capacity();
        if capacity >= min_capacity {
            return Ok(());
        }

        let doubled = capacity.saturating_mul(2).max(INITIAL_CAPACITY);
        let target = if min_capacity > doubled {
            min_capacity
        } else {
            doubled
        };

        self.data.try_reserve_exact(target - self.data.len())
    }

    /// Copy `bytes` onto the logical end.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), TryReserveError> {
        if bytes.is_empty() {
            return Ok(());
        }

        let needed = self.data.len().saturating_add(bytes.len());
        self.reserve(needed)?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Drop the first `n` bytes. Consuming past the end just empties the buffer.
    pub fn consume(&mut self, n: usize) {
        if n == 0 {
            return;
        }

        let len = self.data.len();
        if n >= len {
            self.data.clear();
            return;
        }

        self.data.copy_within(n.., 0);
        self.data.truncate(len - n);
    }

    /// Live bytes `[0, len)`. Invalidated by the next mutating call.
    #[inline]
    pub fn view(&self) -> &[u8] {
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
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
