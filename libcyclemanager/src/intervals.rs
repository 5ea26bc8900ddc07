//! Preconfigured tickers for the storage engine's maintenance loops.

use std::time::Duration;

use crate::ticker::{CycleSchedule, CycleTicker};

const COMPACTION_MIN_INTERVAL: Duration = Duration::from_secs(3);
const COMPACTION_MAX_INTERVAL: Duration = Duration::from_secs(60);
const COMPACTION_BASE: u32 = 2;
const COMPACTION_STEPS: u32 = 4;

const MEMTABLE_FLUSH_MIN_INTERVAL: Duration = Duration::from_millis(100);
const MEMTABLE_FLUSH_MAX_INTERVAL: Duration = Duration::from_secs(5);
const MEMTABLE_FLUSH_BASE: u32 = 2;
const MEMTABLE_FLUSH_STEPS: u32 = 5;

const GEO_COMMIT_LOGGER_MIN_INTERVAL: Duration = Duration::from_secs(10);
const GEO_COMMIT_LOGGER_MAX_INTERVAL: Duration = Duration::from_secs(60);
const GEO_COMMIT_LOGGER_BASE: u32 = 2;
const GEO_COMMIT_LOGGER_STEPS: u32 = 4;

const HNSW_COMMIT_LOGGER_MIN_INTERVAL: Duration = Duration::from_millis(500);
const HNSW_COMMIT_LOGGER_MAX_INTERVAL: Duration = Duration::from_secs(10);
const HNSW_COMMIT_LOGGER_BASE: u32 = 2;
const HNSW_COMMIT_LOGGER_STEPS: u32 = 5;

fn fixed(min: Duration, max: Duration, base: u32, steps: u32) -> CycleTicker {
    CycleTicker::new(CycleSchedule::new(min, max, base, steps).expect("built-in cycle schedule"))
}

/// 3s . 6.8s .. 14.4s .... 29.6s ........ 60s
pub fn compaction_cycle_ticker() -> CycleTicker {
    fixed(
        COMPACTION_MIN_INTERVAL,
        COMPACTION_MAX_INTERVAL,
        COMPACTION_BASE,
        COMPACTION_STEPS,
    )
}

/// 100ms . 258ms .. 574ms .... 1.206s ........ 2.471s ................ 5s
pub fn memtable_flush_cycle_ticker() -> CycleTicker {
    fixed(
        MEMTABLE_FLUSH_MIN_INTERVAL,
        MEMTABLE_FLUSH_MAX_INTERVAL,
        MEMTABLE_FLUSH_BASE,
        MEMTABLE_FLUSH_STEPS,
    )
}

/// 10s . 13.3s .. 20s .... 33.3s ........ 60s
pub fn geo_commit_logger_cycle_ticker() -> CycleTicker {
    fixed(
        GEO_COMMIT_LOGGER_MIN_INTERVAL,
        GEO_COMMIT_LOGGER_MAX_INTERVAL,
        GEO_COMMIT_LOGGER_BASE,
        GEO_COMMIT_LOGGER_STEPS,
    )
}

/// 500ms . 806ms .. 1.42s .... 2.65s ........ 5.1s ................ 10s
pub fn hnsw_commit_logger_cycle_ticker() -> CycleTicker {
    fixed(
        HNSW_COMMIT_LOGGER_MIN_INTERVAL,
        HNSW_COMMIT_LOGGER_MAX_INTERVAL,
        HNSW_COMMIT_LOGGER_BASE,
        HNSW_COMMIT_LOGGER_STEPS,
    )
}
