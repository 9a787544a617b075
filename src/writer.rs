use crate::MergeError;
use crate::cursor::SourceCursor;
use crate::handle_budget::HandleBudget;
use crate::heap::MergeHeap;
use crate::loader::ChunkLoader;
use std::io::Write;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub records_written: u64,
    pub refills: u64,
    /// Sources disabled by a failure hit while refilling.
    pub failed_sources: usize,
}

/// Single-threaded drain loop: pops the global minimum, writes it, and
/// refills a source inline once its loaded chunk has been fully written.
pub struct MergeWriter<'a> {
    loader: &'a ChunkLoader,
}

impl<'a> MergeWriter<'a> {
    pub fn new(loader: &'a ChunkLoader) -> Self {
        Self { loader }
    }

    /// Writes the header and every record reachable from `heap` and `cursors`.
    ///
    /// Any write failure on `sink` aborts the drain.
    pub fn drain<W: Write>(
        &self,
        heap: &mut MergeHeap,
        cursors: &mut [SourceCursor],
        budget: &mut HandleBudget,
        mut sink: W,
    ) -> Result<DrainStats, MergeError> {
        let codec = self.loader.codec();
        let mut stats = DrainStats::default();
        let mut line = String::with_capacity(128);

        sink.write_all(codec.header().as_bytes()).map_err(MergeError::Sink)?;
        sink.write_all(b"\n").map_err(MergeError::Sink)?;

        while let Some(record) = heap.pop() {
            line.clear();
            codec.format(&record, &mut line);
            line.push('\n');
            sink.write_all(line.as_bytes()).map_err(MergeError::Sink)?;
            stats.records_written += 1;

            let cursor = cursors.get_mut(record.source).ok_or_else(|| {
                MergeError::Other(format!("record from unknown source {}", record.source))
            })?;
            cursor.record_emitted();
            if cursor.needs_refill() {
                let chunk = self.loader.load_next(cursor, budget);
                stats.refills += 1;
                if cursor.failure().is_some() {
                    stats.failed_sources += 1;
                }
                debug!(source = %cursor.key(), records = chunk.len(), "refilled");
                heap.extend(chunk);
            }
        }

        sink.flush().map_err(MergeError::Sink)?;
        info!(
            records = stats.records_written,
            refills = stats.refills,
            failed_sources = stats.failed_sources,
            "drain complete"
        );
        Ok(stats)
    }
}
