use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("min interval {min:?} is greater than max interval {max:?}")]
    InvalidBounds { min: Duration, max: Duration },

    #[error("base must be at least 2, got {0}")]
    InvalidBase(u32),

    #[error("steps must be at least 1, got {0}")]
    InvalidSteps(u32),

    #[error("schedule with base {base} and {steps} steps overflows interval arithmetic")]
    Overflow { base: u32, steps: u32 },
}
