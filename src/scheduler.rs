use crate::MergeError;
use crate::cursor::SourceCursor;
use crate::handle_budget::{HandleBudget, HandleGauge};
use crate::heap::MergeHeap;
use crate::loader::ChunkLoader;
use serde::Serialize;
use std::ops::Range;
use std::sync::Mutex;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// What one bootstrap worker did, sent back after its batch completes.
#[derive(Clone, Debug, Serialize)]
pub struct WorkerReport {
    pub worker: usize,
    pub sources: Range<usize>,
    pub records: usize,
    pub failed_sources: usize,
    pub elapsed_ms: u128,
}

/// Splits `n` items into contiguous batches of `ceil(n / workers)`.
///
/// The last batch may be smaller. No empty batch is returned.
pub fn partition(n: usize, workers: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, n);
    let per_worker = n.div_ceil(workers);
    (0..n)
        .step_by(per_worker)
        .map(|start| start..(start + per_worker).min(n))
        .collect()
}

/// Splits a handle budget so the shares add up to at most `total`.
fn budget_shares(total: usize, workers: usize) -> Vec<usize> {
    let base = total / workers;
    let extra = total % workers;
    (0..workers).map(|i| base + usize::from(i < extra)).collect()
}

pub struct Bootstrap {
    pub heap: MergeHeap,
    pub budget: HandleBudget,
    pub reports: Vec<WorkerReport>,
}

/// Runs the first chunk load for every source on a fixed pool of threads.
pub struct LoadScheduler {
    workers: usize,
    handle_budget: usize,
}

impl LoadScheduler {
    pub fn new(workers: usize, handle_budget: usize) -> Self {
        Self {
            workers: workers.max(1),
            handle_budget: handle_budget.max(1),
        }
    }

    /// Worker count actually used for `sources` sources: never more than
    /// there are sources or handles.
    pub fn effective_workers(&self, sources: usize) -> usize {
        self.workers.min(self.handle_budget).min(sources).max(1)
    }

    /// Loads one chunk from every cursor and returns the seeded heap together
    /// with the folded handle budget for the drain phase.
    ///
    /// Each worker owns a disjoint slice of `cursors` and its own share of the
    /// handle budget, so only heap insertion is shared. Returns only after
    /// every worker has been joined.
    pub fn bootstrap(
        &self,
        cursors: &mut [SourceCursor],
        loader: &ChunkLoader,
        gauge: &HandleGauge,
    ) -> Result<Bootstrap, MergeError> {
        let workers = self.effective_workers(cursors.len());
        let ranges = partition(cursors.len(), workers);
        let shares = budget_shares(self.handle_budget, ranges.len().max(1));
        let shared_heap = Mutex::new(MergeHeap::new());
        let (report_tx, report_rx) = crossbeam_channel::unbounded();

        info!(
            sources = cursors.len(),
            workers = ranges.len(),
            handle_budget = self.handle_budget,
            "bootstrap starting"
        );

        let budgets = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(ranges.len());
            let mut rest = &mut *cursors;

            for (worker, (range, share)) in ranges.iter().cloned().zip(&shares).enumerate() {
                let (batch, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                let heap = &shared_heap;
                let report_tx = report_tx.clone();
                let mut budget = HandleBudget::new(*share, gauge.clone());

                handles.push(scope.spawn(move || -> Result<HandleBudget, MergeError> {
                    let started = Instant::now();
                    let mut records = 0;
                    for cursor in batch.iter_mut() {
                        let chunk = loader.load_next(cursor, &mut budget);
                        records += chunk.len();
                        heap.lock()
                            .map_err(|_| MergeError::Worker("merge heap lock poisoned".into()))?
                            .extend(chunk);
                    }
                    let failed_sources = batch.iter().filter(|c| c.failure().is_some()).count();
                    let _ = report_tx.send(WorkerReport {
                        worker,
                        sources: range,
                        records,
                        failed_sources,
                        elapsed_ms: started.elapsed().as_millis(),
                    });
                    Ok(budget)
                }));
            }

            handles
                .into_iter()
                .enumerate()
                .map(|(worker, handle)| {
                    handle
                        .join()
                        .map_err(|_| MergeError::Worker(format!("worker {} panicked", worker)))?
                })
                .collect::<Vec<_>>()
        });
        drop(report_tx);

        let mut budget = HandleBudget::new(self.handle_budget, gauge.clone());
        let mut first_error = None;
        for result in budgets {
            match result {
                Ok(worker_budget) => budget.absorb(worker_budget),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        let mut reports: Vec<WorkerReport> = report_rx.iter().collect();
        reports.sort_by_key(|r| r.worker);
        for report in &reports {
            debug!(
                worker = report.worker,
                records = report.records,
                failed = report.failed_sources,
                elapsed_ms = report.elapsed_ms as u64,
                "bootstrap worker finished"
            );
        }

        let heap = shared_heap
            .into_inner()
            .map_err(|_| MergeError::Worker("merge heap lock poisoned".into()))?;
        info!(records = heap.len(), open_handles = budget.len(), "bootstrap complete");

        Ok(Bootstrap {
            heap,
            budget,
            reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_ceil_batches() {
        assert_eq!(partition(10, 4), vec![0..3, 3..6, 6..9, 9..10]);
        assert_eq!(partition(8, 8), (0..8).map(|i| i..i + 1).collect::<Vec<_>>());
        assert_eq!(partition(3, 8), vec![0..1, 1..2, 2..3]);
        assert_eq!(partition(0, 4), Vec::<Range<usize>>::new());
    }

    #[test]
    fn test_partition_may_use_fewer_workers() {
        // ceil(9 / 4) = 3, so only three batches are needed.
        assert_eq!(partition(9, 4), vec![0..3, 3..6, 6..9]);
    }

    #[test]
    fn test_budget_shares_sum_to_total() {
        assert_eq!(budget_shares(10, 4), vec![3, 3, 2, 2]);
        assert_eq!(budget_shares(80, 8).iter().sum::<usize>(), 80);
    }

    #[test]
    fn test_effective_workers_bounded_by_budget() {
        let scheduler = LoadScheduler::new(8, 3);
        assert_eq!(scheduler.effective_workers(100), 3);
        assert_eq!(scheduler.effective_workers(2), 2);
        assert_eq!(scheduler.effective_workers(0), 1);
    }
}
