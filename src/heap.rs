use crate::record::Record;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Min-heap of records loaded from every source.
#[derive(Debug, Default)]
pub struct MergeHeap {
    heap: BinaryHeap<Reverse<Record>>,
    peak_len: usize,
}

impl MergeHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.heap.push(Reverse(record));
        self.peak_len = self.peak_len.max(self.heap.len());
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        self.heap.extend(records.into_iter().map(Reverse));
        self.peak_len = self.peak_len.max(self.heap.len());
    }

    pub fn pop(&mut self) -> Option<Record> {
        self.heap.pop().map(|Reverse(record)| record)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Largest size the heap has reached.
    pub fn peak_len(&self) -> usize {
        self.peak_len
    }
}
