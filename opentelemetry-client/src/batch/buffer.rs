use std::collections::VecDeque;

/// Bounded FIFO of records waiting to be exported.
///
/// Records offered while the buffer is full are dropped and counted. The
/// buffer itself is not synchronized; the processor serializes access to it.
#[derive(Debug)]
pub struct RecordBuffer<T> {
    records: VecDeque<T>,
    capacity: usize,
    dropped: usize,
}

impl<T> RecordBuffer<T> {
    /// Create an empty buffer holding at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        RecordBuffer {
            // don't reserve the whole queue up front, most processors never fill it
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped: 0,
        }
    }

    /// Append `record` at the tail.
    ///
    /// Returns `false` when the buffer is at capacity; the record is then
    /// dropped and the drop counter incremented.
    pub fn add(&mut self, record: T) -> bool {
        if self.records.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.records.push_back(record);
        true
    }

    /// Remove up to `max_size` records from the head, oldest first.
    pub fn drain_batch(&mut self, max_size: usize) -> Vec<T> {
        let count = max_size.min(self.records.len());
        self.records.drain(..count).collect()
    }

    /// Number of buffered records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of buffered records.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records dropped since creation because the buffer was full.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }
}
