//! Fixed-capacity circular history for chart rendering.

use crate::error::{Result, SnoopError};

/// Circular store of the most recent `capacity` samples.
///
/// Storage is allocated once in [`RingBuffer::new`]; pushes overwrite the
/// oldest slot once full and never reallocate.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    values: Box<[f64]>,
    /// Next slot to write.
    head: usize,
    count: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SnoopError::invalid("ring buffer capacity must be non-zero"));
        }
        let mut values = Vec::new();
        values.try_reserve_exact(capacity)?;
        values.resize(capacity, 0.0);

        Ok(Self {
            values: values.into_boxed_slice(),
            head: 0,
            count: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn push(&mut self, value: f64) {
        let capacity = self.capacity();
        self.values[self.head] = value;
        self.head = (self.head + 1) % capacity;
        if self.count < capacity {
            self.count += 1;
        }
    }

    /// Most recently pushed value.
    pub fn latest(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let capacity = self.capacity();
        Some(self.values[(self.head + capacity - 1) % capacity])
    }

    /// Up to `max_count` most recent values, oldest first.
    pub fn copy_out(&self, max_count: usize) -> Vec<f64> {
        let n = self.count.min(max_count);
        let mut out = Vec::with_capacity(n);
        out.extend(self.window(n));
        out
    }

    /// Fill `out` with the most recent values, oldest first, and return how
    /// many were written.
    pub fn copy_into(&self, out: &mut [f64]) -> usize {
        let n = self.count.min(out.len());
        for (slot, v) in out.iter_mut().zip(self.window(n)) {
            *slot = v;
        }
        n
    }

    /// Drop every sample and zero the storage in place.
    pub fn clear(&mut self) {
        self.values.fill(0.0);
        self.head = 0;
        self.count = 0;
    }

    /// The newest `n` values in chronological order. `n` must not exceed `count`.
    fn window(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        let capacity = self.capacity();
        let start = (self.head + capacity - n) % capacity;
        (0..n).map(move |i| self.values[(start + i) % capacity])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(capacity: usize, values: impl IntoIterator<Item = f64>) -> RingBuffer {
        let mut rb = RingBuffer::new(capacity).unwrap();
        for v in values {
            rb.push(v);
        }
        rb
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            RingBuffer::new(0),
            Err(SnoopError::InvalidArgument(_))
        ));
    }

    #[test]
    fn overflow_evicts_oldest() {
        let rb = filled(5, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(rb.len(), 5);
        assert_eq!(rb.copy_out(5), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(rb.latest(), Some(7.0));
    }

    #[test]
    fn partial_fill_is_chronological() {
        let rb = filled(8, [10.0, 20.0, 30.0]);
        assert_eq!(rb.copy_out(100), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn copy_out_limits_to_most_recent() {
        let rb = filled(5, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(rb.copy_out(2), vec![6.0, 7.0]);
        assert!(rb.copy_out(0).is_empty());
    }

    #[test]
    fn empty_buffer_copies_nothing() {
        let rb = RingBuffer::new(3).unwrap();
        assert!(rb.copy_out(3).is_empty());
        let mut out = [9.0; 3];
        assert_eq!(rb.copy_into(&mut out), 0);
        assert_eq!(out, [9.0; 3]);
        assert_eq!(rb.latest(), None);
    }

    #[test]
    fn copy_into_fills_prefix() {
        let rb = filled(4, [1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut out = [0.0; 6];
        assert_eq!(rb.copy_into(&mut out), 4);
        assert_eq!(out[..4], [2.0, 3.0, 4.0, 5.0]);
        let mut small = [0.0; 2];
        assert_eq!(rb.copy_into(&mut small), 2);
        assert_eq!(small, [4.0, 5.0]);
    }

    #[test]
    fn clear_resets_without_shrinking() {
        let mut rb = filled(3, [1.0, 2.0, 3.0, 4.0]);
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.capacity(), 3);
        rb.push(8.0);
        assert_eq!(rb.copy_out(3), vec![8.0]);
    }

    #[test]
    fn capacity_one_keeps_latest() {
        let rb = filled(1, [1.0, 2.0, 3.0]);
        assert_eq!(rb.copy_out(1), vec![3.0]);
    }
}
