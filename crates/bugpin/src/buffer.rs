//! Fixed-capacity FIFO record store shared by both recorders.

use std::collections::VecDeque;

/// A bounded, ordered buffer of records.
///
/// Pushing beyond capacity evicts the oldest entry. Readers get a
/// defensive copy via [`snapshot`](BoundedBuffer::snapshot); internal
/// state is never handed out by reference.
#[derive(Debug)]
pub struct BoundedBuffer<T> {
    records: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> BoundedBuffer<T> {
    /// Create an empty buffer. Capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a record, evicting the oldest entry if the buffer is full.
    pub fn push(&mut self, record: T) {
        self.records.push_back(record);
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// Returns a copy of the buffered records in insertion order.
    pub fn snapshot(&self) -> Vec<T> {
        self.records.iter().cloned().collect()
    }

    /// Remove all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buf: BoundedBuffer<u32> = BoundedBuffer::new(4);
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn push_preserves_order() {
        let mut buf = BoundedBuffer::new(4);
        buf.push("a");
        buf.push("b");
        buf.push("c");
        assert_eq!(buf.snapshot(), vec!["a", "b", "c"]);
    }

    #[test]
    fn overflow_evicts_oldest_first() {
        let mut buf = BoundedBuffer::new(3);
        for n in 1..=5 {
            buf.push(n);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.snapshot(), vec![3, 4, 5]);
    }

    #[test]
    fn twenty_five_pushes_into_capacity_ten() {
        let mut buf = BoundedBuffer::new(10);
        for n in 1..=25 {
            buf.push(n);
        }
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 10);
        assert_eq!(snap[0], 16);
        assert_eq!(snap[9], 25);
    }

    #[test]
    fn snapshot_is_a_defensive_copy() {
        let mut buf = BoundedBuffer::new(4);
        buf.push(1);
        let snap = buf.snapshot();
        buf.push(2);
        buf.clear();
        assert_eq!(snap, vec![1]);
    }

    #[test]
    fn clear_empties() {
        let mut buf = BoundedBuffer::new(2);
        buf.push(1);
        buf.push(2);
        buf.clear();
        assert!(buf.is_empty());
        buf.push(3);
        assert_eq!(buf.snapshot(), vec![3]);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let mut buf = BoundedBuffer::new(0);
        buf.push(1);
        buf.push(2);
        assert_eq!(buf.snapshot(), vec![2]);
    }
}
