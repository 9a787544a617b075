use crate::MergeError;
use crate::catalog::SourceCatalog;
use crate::codec::{RecordCodec, TickCodec};
use crate::config::MergeConfig;
use crate::handle_budget::HandleGauge;
use crate::loader::ChunkLoader;
use crate::scheduler::{Bootstrap, LoadScheduler, WorkerReport};
use crate::writer::MergeWriter;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Debug, Serialize)]
pub struct SkippedSource {
    pub key: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a completed merge.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MergeReport {
    pub sources: usize,
    pub records_written: u64,
    pub refills: u64,
    pub skipped_sources: Vec<SkippedSource>,
    pub skipped_lines: u64,
    pub peak_open_handles: usize,
    pub peak_heap_len: usize,
    pub handle_evictions: usize,
    pub workers: Vec<WorkerReport>,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sources:            {}", self.sources)?;
        writeln!(f, "records written:    {}", self.records_written)?;
        writeln!(f, "refills:            {}", self.refills)?;
        writeln!(f, "skipped lines:      {}", self.skipped_lines)?;
        writeln!(f, "peak open handles:  {}", self.peak_open_handles)?;
        writeln!(f, "handle evictions:   {}", self.handle_evictions)?;
        write!(f, "peak heap length:   {}", self.peak_heap_len)?;
        if !self.skipped_sources.is_empty() {
            write!(f, "\nskipped sources:")?;
            for skipped in &self.skipped_sources {
                write!(f, "\n  {} ({}): {}", skipped.key, skipped.path.display(), skipped.reason)?;
            }
        }
        Ok(())
    }
}

/// Runs a full merge: discover, bootstrap, drain, release.
pub struct Merger {
    config: MergeConfig,
    codec: Arc<dyn RecordCodec>,
    gauge: HandleGauge,
}

impl Merger {
    pub fn new(config: MergeConfig) -> Result<Self, MergeError> {
        Self::with_codec(config, Arc::new(TickCodec))
    }

    pub fn with_codec(config: MergeConfig, codec: Arc<dyn RecordCodec>) -> Result<Self, MergeError> {
        config.validate()?;
        Ok(Self {
            config,
            codec,
            gauge: HandleGauge::new(),
        })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Gauge counting this merger's open source handles.
    pub fn gauge(&self) -> &HandleGauge {
        &self.gauge
    }

    pub fn run(&self) -> Result<MergeReport, MergeError> {
        let config = &self.config;
        info!(
            input = %config.input_dir.display(),
            output = %config.output_path.display(),
            workers = config.workers,
            chunk_size = config.chunk_size,
            handle_budget = config.handle_budget,
            "merge starting"
        );

        let mut catalog = SourceCatalog::discover(&config.input_dir, Some(&config.output_path));
        info!(sources = catalog.len(), "sources discovered");

        let output = File::create(&config.output_path).map_err(MergeError::Sink)?;
        let loader = ChunkLoader::new(self.codec.clone(), config.chunk_size, config.malformed);
        let scheduler = LoadScheduler::new(config.workers, config.handle_budget);

        let Bootstrap {
            mut heap,
            mut budget,
            reports,
        } = scheduler.bootstrap(catalog.cursors_mut(), &loader, &self.gauge)?;

        let stats = MergeWriter::new(&loader).drain(
            &mut heap,
            catalog.cursors_mut(),
            &mut budget,
            BufWriter::new(output),
        )?;
        let closed = budget.release_all();
        info!(closed, "released source handles");

        let cursors = catalog.cursors();
        let failures = cursors
            .iter()
            .filter_map(|cursor| cursor.failure().map(|error| (cursor, error)));
        let mut skipped_sources = Vec::new();
        for (cursor, error) in failures {
            if !error.is_source_local() {
                return Err(MergeError::Other(format!(
                    "source {} failed: {}",
                    cursor.key(),
                    error
                )));
            }
            skipped_sources.push(SkippedSource {
                key: cursor.key().to_string(),
                path: cursor.path().to_path_buf(),
                reason: error.to_string(),
            });
        }
        for skipped in &skipped_sources {
            warn!(source = %skipped.key, reason = %skipped.reason, "source skipped");
        }

        let report = MergeReport {
            sources: cursors.len(),
            records_written: stats.records_written,
            refills: stats.refills,
            skipped_lines: cursors.iter().map(|c| c.skipped_lines()).sum(),
            skipped_sources,
            peak_open_handles: self.gauge.peak(),
            peak_heap_len: heap.peak_len(),
            handle_evictions: budget.evictions(),
            workers: reports,
        };
        info!(
            records = report.records_written,
            skipped_sources = report.skipped_sources.len(),
            drain_failures = stats.failed_sources,
            peak_open_handles = report.peak_open_handles,
            "merge complete"
        );
        Ok(report)
    }
}

/// Convenience wrapper for `Merger::new(config)?.run()`.
pub fn merge(config: MergeConfig) -> Result<MergeReport, MergeError> {
    Merger::new(config)?.run()
}
