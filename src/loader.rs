use crate::MergeError;
use crate::codec::{ParseError, RecordCodec};
use crate::config::MalformedPolicy;
use crate::cursor::SourceCursor;
use crate::handle_budget::HandleBudget;
use crate::record::{Record, RecordOrigin};
use std::io::{self, BufRead, Seek, SeekFrom};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads one bounded chunk of records from a source, resuming at its cursor.
#[derive(Clone)]
pub struct ChunkLoader {
    codec: Arc<dyn RecordCodec>,
    chunk_size: usize,
    malformed: MalformedPolicy,
}

impl ChunkLoader {
    pub fn new(codec: Arc<dyn RecordCodec>, chunk_size: usize, malformed: MalformedPolicy) -> Self {
        Self {
            codec,
            chunk_size: chunk_size.max(1),
            malformed,
        }
    }

    pub fn codec(&self) -> &Arc<dyn RecordCodec> {
        &self.codec
    }

    /// Loads the next chunk of `cursor`'s source.
    ///
    /// Source-local failures are recorded on the cursor and never returned:
    /// the records parsed before the failure are still handed back and the
    /// cursor is finished from then on.
    pub fn load_next(&self, cursor: &mut SourceCursor, budget: &mut HandleBudget) -> Vec<Record> {
        if cursor.is_finished() {
            return Vec::new();
        }

        let mut records = Vec::new();
        let outcome = self.read_chunk(cursor, budget, &mut records);
        cursor.begin_chunk(records.len());

        if let Err(error) = outcome {
            warn!(source = %cursor.key(), %error, "source disabled");
            budget.close(cursor.index());
            cursor.fail(error);
        } else {
            debug!(
                source = %cursor.key(),
                records = records.len(),
                offset = cursor.offset(),
                eof = cursor.is_end_of_file(),
                "chunk loaded"
            );
        }
        records
    }

    fn read_chunk(
        &self,
        cursor: &mut SourceCursor,
        budget: &mut HandleBudget,
        records: &mut Vec<Record>,
    ) -> Result<(), MergeError> {
        let reader = budget
            .acquire(cursor.index(), cursor.path())
            .map_err(|e| unavailable(cursor, e))?;
        let position = reader.stream_position().map_err(|e| unavailable(cursor, e))?;
        if position != cursor.offset() {
            reader
                .seek(SeekFrom::Start(cursor.offset()))
                .map_err(|e| unavailable(cursor, e))?;
        }

        let mut line = Vec::with_capacity(128);
        if cursor.offset() == 0 {
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| unavailable(cursor, e))?;
            if read > 0 {
                cursor.next_line_number();
            }
        }

        let mut result = Ok(());
        while records.len() < self.chunk_size {
            line.clear();
            let read = match reader.read_until(b'\n', &mut line) {
                Ok(read) => read,
                Err(e) => {
                    result = Err(unavailable(cursor, e));
                    break;
                }
            };
            if read == 0 {
                cursor.mark_end_of_file();
                break;
            }
            let line_number = cursor.next_line_number();
            let parsed = match std::str::from_utf8(&line) {
                Ok(text) => {
                    let text = text.trim_end_matches(['\r', '\n']);
                    if text.trim().is_empty() {
                        continue;
                    }
                    let origin = RecordOrigin {
                        source: cursor.index(),
                        key: cursor.key().clone(),
                        seq: cursor.next_seq(),
                    };
                    self.codec.parse(text, &origin)
                }
                Err(e) => Err(ParseError::new(format!("line is not valid UTF-8: {}", e))),
            };
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => match self.malformed {
                    MalformedPolicy::Abort => {
                        result = Err(MergeError::MalformedRecord {
                            key: cursor.key().to_string(),
                            line: line_number,
                            reason: e.reason,
                        });
                        break;
                    }
                    MalformedPolicy::Skip => {
                        warn!(source = %cursor.key(), line = line_number, reason = %e, "skipping malformed line");
                        cursor.note_skipped_line();
                    }
                },
            }
        }

        if result.is_ok() && !cursor.is_end_of_file() {
            match reader.fill_buf() {
                Ok(rest) if rest.is_empty() => cursor.mark_end_of_file(),
                Ok(_) => {}
                Err(e) => result = Err(unavailable(cursor, e)),
            }
        }

        match reader.stream_position() {
            Ok(position) => cursor.advance_to(position),
            Err(e) if result.is_ok() => result = Err(unavailable(cursor, e)),
            Err(_) => {}
        }
        result
    }
}

fn unavailable(cursor: &SourceCursor, error: io::Error) -> MergeError {
    MergeError::SourceUnavailable {
        key: cursor.key().to_string(),
        path: cursor.path().to_path_buf(),
        error,
    }
}
