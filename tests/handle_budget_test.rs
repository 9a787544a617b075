mod common;

use common::*;
use std::fs;
use tempfile::TempDir;
use tickmerge::config::MergeConfig;
use tickmerge::Merger;

/// Many more sources than handles: evictions happen during both phases, yet
/// the open count never passes the budget and nothing is lost.
#[test]
fn test_open_handles_never_exceed_budget() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    fs::create_dir_all(&input).unwrap();

    let mut rng = Lcg::new(99);
    let mut total = 0;
    for s in 0..40 {
        let key = format!("S{:03}", s);
        let mut offset = 0;
        let rows: Vec<String> = (0..(5 + rng.below(10)))
            .map(|i| {
                offset += 1 + rng.below(5);
                Tick::new(&key, offset, 1.0 + i as f64, 1).source_row()
            })
            .collect();
        total += rows.len();
        write_source(&input, &format!("{}.txt", key), &rows);
    }

    for (workers, budget) in [(3, 4), (8, 5), (1, 1), (16, 40)] {
        let output = dir.path().join(format!("merged_{}_{}.txt", workers, budget));
        let config = MergeConfig::new(&input, &output)
            .with_workers(workers)
            .with_chunk_size(2)
            .with_handle_budget(budget);
        let merger = Merger::new(config).unwrap();

        let report = merger.run().unwrap();

        assert!(
            report.peak_open_handles <= budget,
            "peak {} exceeded budget {}",
            report.peak_open_handles,
            budget
        );
        assert_eq!(merger.gauge().open(), 0, "handles left open after run");
        assert_eq!(report.records_written as usize, total);
        assert_eq!(read_lines(&output).len(), total + 1);
        if budget < 40 {
            assert!(report.handle_evictions > 0);
        }
    }
}

#[test]
fn test_bootstrap_reports_cover_every_source() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    for s in 0..10 {
        let key = format!("K{}", s);
        write_source(&input, &format!("{}.txt", key), &[Tick::new(&key, s, 1.0, 1).source_row()]);
    }

    let config = MergeConfig::new(&input, dir.path().join("out.txt"))
        .with_workers(4)
        .with_handle_budget(10);
    let report = Merger::new(config).unwrap().run().unwrap();

    let ranges: Vec<_> = report.workers.iter().map(|w| w.sources.clone()).collect();
    assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);
    assert_eq!(report.workers.iter().map(|w| w.records).sum::<usize>(), 10);
}
