use crate::MergeError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-source read position and refill bookkeeping.
///
/// A cursor is only ever touched through `&mut` by whoever is loading that
/// source: its bootstrap worker first, the writer after the join.
#[derive(Debug)]
pub struct SourceCursor {
    index: usize,
    path: PathBuf,
    key: Arc<str>,
    offset: u64,
    end_of_file: bool,
    emitted_since_refill: usize,
    loaded_in_chunk: usize,
    lines_read: u64,
    next_seq: u64,
    chunks_loaded: usize,
    records_loaded: u64,
    skipped_lines: u64,
    failure: Option<MergeError>,
}

impl SourceCursor {
    pub fn new(index: usize, path: PathBuf, key: impl Into<Arc<str>>) -> Self {
        Self {
            index,
            path,
            key: key.into(),
            offset: 0,
            end_of_file: false,
            emitted_since_refill: 0,
            loaded_in_chunk: 0,
            lines_read: 0,
            next_seq: 0,
            chunks_loaded: 0,
            records_loaded: 0,
            skipped_lines: 0,
            failure: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &Arc<str> {
        &self.key
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_end_of_file(&self) -> bool {
        self.end_of_file
    }

    /// No further reads will be attempted: input exhausted or the source failed.
    pub fn is_finished(&self) -> bool {
        self.end_of_file || self.failure.is_some()
    }

    pub fn emitted_since_refill(&self) -> usize {
        self.emitted_since_refill
    }

    pub fn chunks_loaded(&self) -> usize {
        self.chunks_loaded
    }

    pub fn records_loaded(&self) -> u64 {
        self.records_loaded
    }

    pub fn skipped_lines(&self) -> u64 {
        self.skipped_lines
    }

    pub fn failure(&self) -> Option<&MergeError> {
        self.failure.as_ref()
    }

    /// Refill is due once every record of the current chunk has been written.
    pub fn needs_refill(&self) -> bool {
        !self.is_finished() && self.emitted_since_refill >= self.loaded_in_chunk
    }

    pub fn record_emitted(&mut self) {
        self.emitted_since_refill += 1;
    }

    pub(crate) fn advance_to(&mut self, offset: u64) {
        debug_assert!(offset >= self.offset, "cursor offset moved backwards");
        self.offset = self.offset.max(offset);
    }

    pub(crate) fn mark_end_of_file(&mut self) {
        self.end_of_file = true;
    }

    pub(crate) fn begin_chunk(&mut self, loaded: usize) {
        self.emitted_since_refill = 0;
        self.loaded_in_chunk = loaded;
        self.chunks_loaded += 1;
        self.records_loaded += loaded as u64;
    }

    pub(crate) fn next_line_number(&mut self) -> u64 {
        self.lines_read += 1;
        self.lines_read
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    pub(crate) fn note_skipped_line(&mut self) {
        self.skipped_lines += 1;
    }

    /// Records the first failure; the cursor reads nothing afterwards.
    pub(crate) fn fail(&mut self, error: MergeError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }
}
