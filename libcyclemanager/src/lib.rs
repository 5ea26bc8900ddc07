//! Adaptive cycle scheduling for background maintenance.
//!
//! A [`CycleSchedule`] maps a tick number to a wait interval that grows
//! exponentially from `min` to `max` over a fixed number of steps. A
//! [`CycleTicker`] walks that schedule and is reset whenever the caller
//! observed real work, so busy loops react fast and idle loops back off.
//! [`CycleManager`] runs one such loop on the tokio runtime.

pub mod error;
pub mod intervals;
pub mod manager;
pub mod ticker;

pub use error::CycleError;
pub use intervals::{
    compaction_cycle_ticker, geo_commit_logger_cycle_ticker, hnsw_commit_logger_cycle_ticker,
    memtable_flush_cycle_ticker,
};
pub use manager::{CycleCallback, CycleManager};
pub use ticker::{CycleSchedule, CycleTicker};
