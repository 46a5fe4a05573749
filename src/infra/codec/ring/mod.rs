//! Fixed-capacity byte ring used by the receive path.
//!
//! Writing past the capacity wraps and overwrites the oldest bytes without
//! error; the ring then always reports itself full.

#[derive(Debug, Clone)]
pub struct CircularByteBuffer<const N: usize> {
    data: [u8; N],
    write_index: usize,
    wrapped: bool,
}

impl<const N: usize> Default for CircularByteBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CircularByteBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: [0; N],
            write_index: 0,
            wrapped: false,
        }
    }

    /// Append one byte, overwriting the oldest one once the ring is full.
    pub fn push(&mut self, byte: u8) {
        if N == 0 {
            return;
        }
        self.data[self.write_index] = byte;
        self.write_index += 1;
        if self.write_index == N {
            self.write_index = 0;
            self.wrapped = true;
        }
    }

    /// Number of bytes currently held.
    #[inline]
    pub fn len(&self) -> usize {
        if self.wrapped {
            N
        } else {
            self.write_index
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether older bytes have been overwritten since the last `clear`.
    #[inline]
    pub fn has_wrapped(&self) -> bool {
        self.wrapped
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Content in arrival order, oldest first, as two contiguous parts.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        if self.wrapped {
            (&self.data[self.write_index..], &self.data[..self.write_index])
        } else {
            (&self.data[..self.write_index], &self.data[..0])
        }
    }

    /// Forget the content; storage is kept.
    pub fn clear(&mut self) {
        self.write_index = 0;
        self.wrapped = false;
    }
}
