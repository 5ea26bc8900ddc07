use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ticker::CycleTicker;

/// One pass of a maintenance loop.
///
/// Returns `true` when the pass found work to do, which shrinks the next
/// wait back to the schedule's minimum.
#[async_trait]
pub trait CycleCallback: Send + 'static {
    async fn run(&mut self) -> bool;
}

#[async_trait]
impl<F> CycleCallback for F
where
    F: FnMut() -> bool + Send + 'static,
{
    async fn run(&mut self) -> bool {
        (self)()
    }
}

/// Drives a [`CycleCallback`] on its own tokio task, sleeping between
/// passes for whatever the ticker yields.
pub struct CycleManager {
    name: String,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl CycleManager {
    pub fn start<C: CycleCallback>(name: &str, mut ticker: CycleTicker, mut callback: C) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let cycle = name.to_owned();

        let handle = tokio::spawn(async move {
            debug!(cycle = %cycle, "cycle manager started");
            loop {
                let Some(wait) = ticker.next() else {
                    break;
                };
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
                if callback.run().await {
                    ticker.reset();
                }
            }
            ticker.stop();
            debug!(cycle = %cycle, "cycle manager stopped");
        });

        CycleManager {
            name: name.to_owned(),
            token,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancels the loop and waits for the current pass to finish.
    pub async fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            warn!(cycle = %self.name, "cycle task ended abnormally: {e}");
        }
    }
}

impl Drop for CycleManager {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    struct Recorder {
        calls: Arc<Mutex<Vec<Instant>>>,
        busy_until: usize,
    }

    #[async_trait]
    impl CycleCallback for Recorder {
        async fn run(&mut self) -> bool {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            calls.len() <= self.busy_until
        }
    }

    fn assert_close(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff <= Duration::from_millis(1),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_manager_backs_off_when_idle() {
        let ticker = CycleTicker::with_bounds(
            Duration::from_millis(100),
            Duration::from_millis(800),
            2,
            3,
        )
        .unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let mut manager = CycleManager::start(
            "idle",
            ticker.clone(),
            Recorder {
                calls: calls.clone(),
                busy_until: 0,
            },
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        manager.stop().await;
        assert!(!manager.is_running());

        let calls = calls.lock().unwrap().clone();
        assert!(calls.len() >= 4);
        let mut prev = start;
        for (i, at) in calls.iter().take(4).enumerate() {
            assert_close(*at - prev, ticker.schedule().interval(i as u32));
            prev = *at;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_manager_resets_after_work() {
        let ticker = CycleTicker::with_bounds(
            Duration::from_millis(100),
            Duration::from_millis(800),
            2,
            3,
        )
        .unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();
        let mut manager = CycleManager::start(
            "busy",
            ticker,
            Recorder {
                calls: calls.clone(),
                busy_until: 3,
            },
        );

        tokio::time::sleep(Duration::from_millis(450)).await;
        manager.stop().await;

        let calls = calls.lock().unwrap().clone();
        // every pass found work, so every wait stays at the minimum
        assert!(calls.len() >= 3);
        let mut prev = start;
        for at in calls.iter().take(3) {
            assert_close(*at - prev, Duration::from_millis(100));
            prev = *at;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_manager_accepts_closures_and_stops() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let ticker = CycleTicker::with_bounds(
            Duration::from_millis(10),
            Duration::from_millis(20),
            2,
            1,
        )
        .unwrap();
        let mut manager = CycleManager::start("closure", ticker, move || {
            seen.fetch_add(1, Ordering::SeqCst);
            false
        });
        assert_eq!(manager.name(), "closure");
        assert!(manager.is_running());

        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.stop().await;
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop > 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }
}
