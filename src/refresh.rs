//! Periodic feed refresh.
//!
//! A single background task fetches the feed immediately and then once per
//! period, handing each outcome to the dashboard through a channel. Fetches
//! are awaited inside the task, so there is never more than one request in
//! flight; ticks that fall due during a slow fetch are delayed rather than
//! fired in a burst.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::FeedSource;
use crate::models::FeatureCollection;

/// Fixed poll period of the dashboard.
pub const REFRESH_PERIOD: Duration = Duration::from_millis(300_000);

/// Undelivered outcomes buffered between the task and the dashboard.
const UPDATE_CHANNEL_CAPACITY: usize = 4;

/// Outcome of one scheduled fetch.
#[derive(Debug)]
pub enum FeedUpdate {
    /// A validated snapshot that replaces the current one.
    Snapshot(FeatureCollection),
    /// The fetch failed; the message is shown to the user.
    Failed(String),
}

/// Handle to a running refresh loop.
///
/// Calling [`Refresher::stop`] (or dropping the handle) cancels the task and
/// discards anything it had already queued, so no update is delivered after
/// teardown.
pub struct Refresher {
    token: CancellationToken,
    rx: mpsc::Receiver<FeedUpdate>,
    task: Option<JoinHandle<()>>,
}

impl Refresher {
    /// Start polling `source` every `period`. The first fetch starts at once.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S>(source: S, period: Duration) -> Self
    where
        S: FeedSource + 'static,
    {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let token = CancellationToken::new();
        let task = tokio::spawn(poll_feed(source, period, tx, token.clone()));

        tracing::info!(period_secs = period.as_secs(), "refresh loop started");

        Self {
            token,
            rx,
            task: Some(task),
        }
    }

    /// Wait for the next outcome. Returns `None` once stopped.
    pub async fn recv(&mut self) -> Option<FeedUpdate> {
        if self.is_stopped() {
            return None;
        }
        self.rx.recv().await
    }

    /// Stop the loop. Idempotent.
    pub fn stop(&mut self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::info!("refresh loop stopped");
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_feed<S: FeedSource>(
    source: S,
    period: Duration,
    tx: mpsc::Sender<FeedUpdate>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick_count = 0u64;

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        tick_count += 1;

        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => break,
            result = source.fetch() => result,
        };

        let update = match outcome {
            Ok(feed) => {
                tracing::debug!(tick = tick_count, events = feed.features.len(), "fetch succeeded");
                FeedUpdate::Snapshot(feed)
            }
            Err(e) => {
                tracing::warn!(tick = tick_count, "fetch failed, will retry next period: {e}");
                FeedUpdate::Failed(e.to_string())
            }
        };

        let delivered = tokio::select! {
            biased;
            () = token.cancelled() => false,
            sent = tx.send(update) => sent.is_ok(),
        };
        if !delivered {
            break;
        }
    }

    tracing::debug!(ticks = tick_count, "refresh task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::errors::FeedError;
    use crate::test_helpers::{EventBuilder, collection};

    const PERIOD: Duration = Duration::from_secs(300);

    /// Succeeds on every call, optionally taking `delay` to answer.
    #[derive(Clone, Default)]
    struct CountingSource {
        started: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl FeedSource for CountingSource {
        async fn fetch(&self) -> Result<FeatureCollection, FeedError> {
            let n = self.started.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(collection(vec![EventBuilder::new(&format!("ev{n}")).build()]))
        }
    }

    /// Fails on every call after the first.
    #[derive(Clone, Default)]
    struct FlakySource {
        calls: Arc<AtomicUsize>,
    }

    impl FeedSource for FlakySource {
        async fn fetch(&self) -> Result<FeatureCollection, FeedError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(collection(vec![EventBuilder::new("first").build()]))
            } else {
                Err(FeedError::Api {
                    status: 500,
                    message: "boom".into(),
                })
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate_then_periodic() {
        let source = CountingSource::default();
        let started = source.started.clone();
        let mut refresher = Refresher::spawn(source, PERIOD);

        let begin = tokio::time::Instant::now();
        assert!(matches!(refresher.recv().await, Some(FeedUpdate::Snapshot(_))));
        assert_eq!(begin.elapsed(), Duration::ZERO);
        assert_eq!(started.load(Ordering::SeqCst), 1);

        assert!(matches!(refresher.recv().await, Some(FeedUpdate::Snapshot(_))));
        assert_eq!(begin.elapsed(), PERIOD);
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_and_loop_continues() {
        let source = FlakySource::default();
        let calls = source.calls.clone();
        let mut refresher = Refresher::spawn(source, PERIOD);

        assert!(matches!(refresher.recv().await, Some(FeedUpdate::Snapshot(_))));
        match refresher.recv().await {
            Some(FeedUpdate::Failed(message)) => {
                assert_eq!(message, "USGS API error (HTTP 500): boom");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(matches!(refresher.recv().await, Some(FeedUpdate::Failed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_updates_after_stop() {
        let source = CountingSource::default();
        let started = source.started.clone();
        let mut refresher = Refresher::spawn(source, PERIOD);

        assert!(refresher.recv().await.is_some());
        refresher.stop();
        assert!(refresher.is_stopped());

        // Let several periods elapse.
        tokio::time::sleep(PERIOD * 5).await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(refresher.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_inflight_fetch_discards_result() {
        let source = CountingSource {
            delay: Duration::from_secs(60),
            ..CountingSource::default()
        };
        let started = source.started.clone();
        let in_flight = source.in_flight.clone();
        let mut refresher = Refresher::spawn(source, PERIOD);

        // Let the task start its first (slow) fetch.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(in_flight.load(Ordering::SeqCst), 1);

        refresher.stop();
        tokio::time::sleep(PERIOD * 3).await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(refresher.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetches_never_overlap() {
        let source = CountingSource {
            delay: PERIOD * 2,
            ..CountingSource::default()
        };
        let max_in_flight = source.max_in_flight.clone();
        let mut refresher = Refresher::spawn(source, PERIOD);

        for _ in 0..4 {
            assert!(refresher.recv().await.is_some());
        }

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_loop() {
        let source = CountingSource::default();
        let started = source.started.clone();
        {
            let mut refresher = Refresher::spawn(source, PERIOD);
            assert!(refresher.recv().await.is_some());
        }

        tokio::time::sleep(PERIOD * 4).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }
}
