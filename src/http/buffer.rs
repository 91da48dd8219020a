/// A growable read buffer with a `filled` watermark.
///
/// Bytes in `[0, filled)` have been read but not yet consumed by the parser.
/// Consumed bytes are removed by shifting the remainder to offset 0, and the
/// storage doubles whenever a read is about to happen with no spare room.
#[derive(Debug)]
pub struct ReadBuffer {
    data: Vec<u8>,
    filled: usize,
}

impl ReadBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(1)],
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Unconsumed bytes.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.data.len()
    }

    /// Doubles the storage if it is full, unless that would exceed `limit`.
    ///
    /// Returns `false` when the buffer is full and cannot grow.
    pub fn reserve_within(&mut self, limit: usize) -> bool {
        if !self.is_full() {
            return true;
        }

        let doubled = self.data.len() * 2;
        if doubled > limit {
            if self.data.len() >= limit {
                return false;
            }
            self.data.resize(limit, 0);
        } else {
            self.data.resize(doubled, 0);
        }
        true
    }

    /// The writable area past the watermark.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.filled..]
    }

    /// Marks `n` freshly read bytes as filled.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(self.filled + n <= self.data.len());
        self.filled += n;
    }

    /// Drops `n` bytes from the front, shifting the remainder to offset 0.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.filled);
        self.data.copy_within(n..self.filled, 0);
        self.filled -= n;
    }
}
