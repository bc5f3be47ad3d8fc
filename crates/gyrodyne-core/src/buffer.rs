//! Fixed-capacity ring buffer for time-ordered samples.
//!
//! The estimation pipeline keeps short histories of angular velocity,
//! derivatives, and control input. [`CircularBuffer`] overwrites the oldest
//! entry when full and addresses samples by *offset from the tail* (offset 0
//! is the most recent sample), which is how every finite-difference kernel
//! in the stack reads its window.

// ---------------------------------------------------------------------------
// CircularBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity overwrite-oldest sample buffer.
///
/// Offsets past the number of inserted samples are a caller contract
/// violation: stages gate on [`len`](Self::len) (or on the timestep
/// stability counter) before reading deep offsets. [`from_tail`](Self::from_tail)
/// panics on violation rather than returning stale memory.
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    /// Index of the oldest element once the buffer has wrapped.
    head: usize,
}

impl<T: Copy> CircularBuffer<T> {
    /// Create an empty buffer with the given fixed capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "circular buffer capacity must be nonzero");
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Number of valid samples (at most the capacity).
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no sample has been inserted.
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` once the buffer has wrapped at least once.
    pub const fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Fixed capacity.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a sample, overwriting the oldest one when full.
    pub fn push(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// The most recent sample, if any.
    pub fn last(&self) -> Option<T> {
        self.get(0)
    }

    /// Sample at `offset` from the tail (0 = most recent), if valid.
    pub fn get(&self, offset: usize) -> Option<T> {
        if offset >= self.data.len() {
            return None;
        }
        let newest = if self.is_full() {
            (self.head + self.capacity - 1) % self.capacity
        } else {
            self.data.len() - 1
        };
        let index = (newest + self.capacity - offset) % self.capacity;
        Some(self.data[index])
    }

    /// Sample at `offset` from the tail (0 = most recent).
    ///
    /// # Panics
    ///
    /// Panics when `offset >= len()`. Readers must gate on fill count.
    pub fn from_tail(&self, offset: usize) -> T {
        self.get(offset).unwrap_or_else(|| {
            panic!(
                "buffer offset {offset} out of range ({} samples)",
                self.data.len()
            )
        })
    }

    /// Drop all samples. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// Iterate samples oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let (wrapped, linear) = if self.is_full() {
            self.data.split_at(self.head)
        } else {
            (&[][..], self.data.as_slice())
        };
        linear.iter().copied().chain(wrapped.iter().copied())
    }
}

impl CircularBuffer<f64> {
    /// Mean over the valid samples. Zero when empty.
    pub fn average(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.data.len() as f64;
        self.data.iter().sum::<f64>() / n
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
