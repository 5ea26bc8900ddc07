use std::time::Duration;

use crate::error::CycleError;

/// Immutable exponential schedule between `min` and `max`.
///
/// `interval(i) = min + (max - min) * (base^i - 1) / (base^steps - 1)` for
/// `i <= steps` and `max` afterwards. The arithmetic is done on whole
/// nanoseconds, so both ends of the curve are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSchedule {
    min: Duration,
    max: Duration,
    base: u32,
    steps: u32,
    span_nanos: u128,
    denominator: u128,
}

impl CycleSchedule {
    pub fn new(min: Duration, max: Duration, base: u32, steps: u32) -> Result<Self, CycleError> {
        if min > max {
            return Err(CycleError::InvalidBounds { min, max });
        }
        if base < 2 {
            return Err(CycleError::InvalidBase(base));
        }
        if steps < 1 {
            return Err(CycleError::InvalidSteps(steps));
        }

        let overflow = CycleError::Overflow { base, steps };
        let denominator = (base as u128)
            .checked_pow(steps)
            .ok_or_else(|| overflow.clone())?
            - 1;
        let span_nanos = (max - min).as_nanos();
        // offset = span * (base^i - 1) / denominator must stay representable
        if span_nanos > u64::MAX as u128 || span_nanos.checked_mul(denominator).is_none() {
            return Err(overflow);
        }

        Ok(CycleSchedule {
            min,
            max,
            base,
            steps,
            span_nanos,
            denominator,
        })
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn interval(&self, i: u32) -> Duration {
        if i >= self.steps {
            return self.max;
        }
        let numerator = (self.base as u128).pow(i) - 1;
        let offset = self.span_nanos * numerator / self.denominator;
        self.min + Duration::from_nanos(offset as u64)
    }
}

/// Walks a [`CycleSchedule`] one tick at a time.
///
/// Once stopped, `next` always yields `None` and `reset` has no effect.
#[derive(Debug, Clone)]
pub struct CycleTicker {
    schedule: CycleSchedule,
    tick: u32,
    stopped: bool,
}

impl CycleTicker {
    pub fn new(schedule: CycleSchedule) -> Self {
        CycleTicker {
            schedule,
            tick: 0,
            stopped: false,
        }
    }

    pub fn with_bounds(
        min: Duration,
        max: Duration,
        base: u32,
        steps: u32,
    ) -> Result<Self, CycleError> {
        Ok(Self::new(CycleSchedule::new(min, max, base, steps)?))
    }

    pub fn schedule(&self) -> &CycleSchedule {
        &self.schedule
    }

    /// Returns the interval for the current tick and advances the counter.
    pub fn next(&mut self) -> Option<Duration> {
        if self.stopped {
            return None;
        }
        let interval = self.schedule.interval(self.tick);
        // past `steps` every tick maps to `max`, no need to keep counting
        if self.tick <= self.schedule.steps {
            self.tick += 1;
        }
        Some(interval)
    }

    /// Moves the ticker back to the shortest interval.
    pub fn reset(&mut self) {
        if !self.stopped {
            self.tick = 0;
        }
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Sleeps for the next interval on the tokio clock.
    ///
    /// Returns `false` without sleeping when the ticker has been stopped.
    pub async fn tick(&mut self) -> bool {
        match self.next() {
            Some(wait) => {
                tokio::time::sleep(wait).await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_schedule_endpoints_are_exact() {
        let cases = [
            (ms(3000), ms(60_000), 2, 4),
            (ms(100), ms(5000), 2, 5),
            (ms(1), ms(7), 3, 1),
            (ms(10), ms(10), 2, 3),
            (Duration::from_nanos(1), Duration::from_secs(3600), 10, 9),
        ];
        for (min, max, base, steps) in cases {
            let schedule = CycleSchedule::new(min, max, base, steps).unwrap();
            assert_eq!(schedule.interval(0), min);
            assert_eq!(schedule.interval(steps), max);
        }
    }

    #[test]
    fn test_schedule_strictly_increasing() {
        for base in 2..6 {
            for steps in 1..8 {
                let schedule = CycleSchedule::new(ms(50), ms(90_000), base, steps).unwrap();
                for i in 0..steps {
                    assert!(
                        schedule.interval(i) < schedule.interval(i + 1),
                        "base {base} steps {steps} tick {i}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_schedule_clamps_past_steps() {
        let schedule = CycleSchedule::new(ms(500), ms(10_000), 2, 5).unwrap();
        for i in [6, 7, 100, u32::MAX] {
            assert_eq!(schedule.interval(i), ms(10_000));
        }
    }

    #[test]
    fn test_schedule_rejects_invalid_parameters() {
        assert_eq!(
            CycleSchedule::new(ms(2), ms(1), 2, 1),
            Err(CycleError::InvalidBounds {
                min: ms(2),
                max: ms(1)
            })
        );
        assert_eq!(
            CycleSchedule::new(ms(1), ms(2), 1, 1),
            Err(CycleError::InvalidBase(1))
        );
        assert_eq!(
            CycleSchedule::new(ms(1), ms(2), 2, 0),
            Err(CycleError::InvalidSteps(0))
        );
        assert!(matches!(
            CycleSchedule::new(ms(1), ms(2), 2, 200),
            Err(CycleError::Overflow { .. })
        ));
    }

    #[test]
    fn test_ticker_next_and_reset() {
        let mut ticker = CycleTicker::with_bounds(ms(100), ms(1000), 3, 2).unwrap();
        assert_eq!(ticker.next(), Some(ms(100)));
        assert_eq!(ticker.next(), Some(ms(325)));
        assert_eq!(ticker.next(), Some(ms(1000)));
        assert_eq!(ticker.next(), Some(ms(1000)));

        ticker.reset();
        assert_eq!(ticker.next(), Some(ms(100)));
        assert_eq!(ticker.next(), Some(ms(325)));
    }

    #[test]
    fn test_ticker_stop_is_final() {
        let mut ticker = CycleTicker::with_bounds(ms(100), ms(1000), 2, 3).unwrap();
        assert!(ticker.next().is_some());
        ticker.stop();
        assert!(ticker.is_stopped());
        assert_eq!(ticker.next(), None);
        ticker.reset();
        assert_eq!(ticker.next(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_tick_sleeps_for_interval() {
        let mut ticker = CycleTicker::with_bounds(ms(100), ms(400), 2, 2).unwrap();
        let start = tokio::time::Instant::now();
        assert!(ticker.tick().await);
        assert!(start.elapsed() >= ms(100));

        ticker.stop();
        let before = tokio::time::Instant::now();
        assert!(!ticker.tick().await);
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
