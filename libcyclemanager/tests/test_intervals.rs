use libcyclemanager::{
    CycleTicker, compaction_cycle_ticker, geo_commit_logger_cycle_ticker,
    hnsw_commit_logger_cycle_ticker, memtable_flush_cycle_ticker,
};
use std::time::Duration;

fn drain(ticker: &mut CycleTicker, n: usize) -> Vec<Duration> {
    (0..n).map(|_| ticker.next().unwrap()).collect()
}

fn assert_sequence(actual: &[Duration], expected_ms: &[f64]) {
    assert_eq!(actual.len(), expected_ms.len());
    for (got, want) in actual.iter().zip(expected_ms) {
        let got_ms = got.as_secs_f64() * 1000.0;
        assert!(
            (got_ms - want).abs() <= 1.0,
            "expected {want}ms, got {got_ms}ms in {actual:?}"
        );
    }
}

#[test]
fn test_memtable_flush_sequence() {
    let mut ticker = memtable_flush_cycle_ticker();
    let seq = drain(&mut ticker, 6);
    assert_sequence(&seq, &[100.0, 258.0, 574.0, 1206.0, 2471.0, 5000.0]);
    assert_eq!(seq[0], Duration::from_millis(100));
    assert_eq!(seq[5], Duration::from_secs(5));
}

#[test]
fn test_compaction_sequence() {
    let mut ticker = compaction_cycle_ticker();
    let seq = drain(&mut ticker, 5);
    assert_sequence(&seq, &[3000.0, 6800.0, 14_400.0, 29_600.0, 60_000.0]);
}

#[test]
fn test_geo_commit_logger_sequence() {
    let mut ticker = geo_commit_logger_cycle_ticker();
    let seq = drain(&mut ticker, 5);
    assert_sequence(&seq, &[10_000.0, 13_333.3, 20_000.0, 33_333.3, 60_000.0]);
}

#[test]
fn test_hnsw_commit_logger_sequence() {
    let mut ticker = hnsw_commit_logger_cycle_ticker();
    let seq = drain(&mut ticker, 6);
    assert_sequence(&seq, &[500.0, 806.5, 1419.4, 2645.2, 5096.8, 10_000.0]);
}

#[test]
fn test_factories_stay_at_max_and_reset() {
    for mut ticker in [
        compaction_cycle_ticker(),
        memtable_flush_cycle_ticker(),
        geo_commit_logger_cycle_ticker(),
        hnsw_commit_logger_cycle_ticker(),
    ] {
        let max = ticker.schedule().max();
        let min = ticker.schedule().min();
        let steps = ticker.schedule().steps() as usize;
        let seq = drain(&mut ticker, steps + 10);
        assert!(seq[steps..].iter().all(|d| *d == max));

        ticker.reset();
        assert_eq!(ticker.next(), Some(min));
    }
}
