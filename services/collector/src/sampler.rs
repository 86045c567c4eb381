//! Periodic state sampler
//!
//! On a fixed cadence, takes an immutable copy of the symbol state
//! store, wraps it as a periodic persistence record, and appends it to
//! the batch cache. Runs until the feed's liveness signal flips false,
//! then performs one final flush and stops.
//!
//! Scheduling: ticks fire `snap_every` after the previous tick's
//! nominal time, not after its completion, so slow samples do not
//! accumulate drift. A zero period means busy-loop sampling — a
//! degraded/debug mode where the sampler runs as fast as each iteration
//! completes, with a cooperative yield between iterations.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::BatchCache;
use crate::record::{PersistenceRecord, RecordSink};
use crate::state::SymbolStateStore;

/// Sampler lifecycle states. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Created but not yet running.
    Idle,
    /// Actively sampling on schedule.
    Running,
    /// Terminated after the liveness signal dropped.
    Stopped,
}

/// Periodic sampler that feeds full-state snapshots to the batch cache.
pub struct Sampler<S> {
    store: Arc<SymbolStateStore>,
    cache: BatchCache<PersistenceRecord, S>,
    snap_every: Duration,
    liveness: watch::Receiver<bool>,
    source: String,
    state: SamplerState,
    ticks: u64,
}

impl<S> Sampler<S>
where
    S: RecordSink<PersistenceRecord>,
{
    /// Create an idle sampler.
    ///
    /// `liveness` is the feed's connection-alive signal; the sampler
    /// stops when it flips false, never on its own error counts.
    pub fn new(
        store: Arc<SymbolStateStore>,
        cache: BatchCache<PersistenceRecord, S>,
        snap_every: Duration,
        liveness: watch::Receiver<bool>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            store,
            cache,
            snap_every,
            liveness,
            source: source.into(),
            state: SamplerState::Idle,
            ticks: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Number of periodic records produced so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run the sampling loop until liveness drops.
    ///
    /// The final flush of any pending records is the last action before
    /// the transition to `Stopped`; no tick fires after it.
    pub async fn run(&mut self) {
        self.state = SamplerState::Running;
        info!(
            snap_every_secs = self.snap_every.as_secs_f64(),
            threshold = self.cache.threshold(),
            "sampler started"
        );

        if self.snap_every.is_zero() {
            warn!("zero sample period: busy-loop sampling (degraded mode)");
            self.run_busy_loop().await;
        } else {
            self.run_scheduled().await;
        }

        if let Err(err) = self.cache.flush().await {
            warn!(
                pending = self.cache.pending_len(),
                error = %err,
                "final flush failed; pending records lost at shutdown"
            );
        }

        self.state = SamplerState::Stopped;
        info!(ticks = self.ticks, "sampler stopped");
    }

    /// Fixed-cadence loop. The first tick fires one full period after
    /// start; later ticks are scheduled from nominal tick times.
    async fn run_scheduled(&mut self) {
        let mut timer = time::interval_at(Instant::now() + self.snap_every, self.snap_every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Burst);

        while self.alive() {
            tokio::select! {
                _ = timer.tick() => {
                    if !self.alive() {
                        break;
                    }
                    self.sample_once().await;
                }
                changed = self.liveness.changed() => {
                    if changed.is_err() || !self.alive() {
                        break;
                    }
                }
            }
        }
    }

    /// Degraded mode: sample as fast as the previous iteration
    /// completes, yielding between iterations.
    async fn run_busy_loop(&mut self) {
        while self.alive() {
            self.sample_once().await;
            tokio::task::yield_now().await;
        }
    }

    fn alive(&self) -> bool {
        *self.liveness.borrow()
    }

    /// One tick: copy all symbol state, wrap it, feed it to the cache.
    ///
    /// A failed flush is logged, not retried here — the batch rides
    /// along in memory until a later flush succeeds.
    async fn sample_once(&mut self) {
        let sampled_at = Utc::now();
        let states = self.store.snapshot_all();
        let record = PersistenceRecord::periodic(&self.source, states, sampled_at);
        self.ticks += 1;

        match self.cache.append(record).await {
            Ok(0) => {}
            Ok(flushed) => debug!(flushed, tick = self.ticks, "snapshot batch flushed"),
            Err(err) => warn!(
                pending = self.cache.pending_len(),
                error = %err,
                "snapshot flush failed; will retry on a later tick"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordPayload, SinkWriteError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use types::symbol::Symbol;

    #[derive(Default)]
    struct MemorySink {
        batches: Mutex<Vec<Vec<PersistenceRecord>>>,
        failures_remaining: AtomicU32,
    }

    impl MemorySink {
        fn fail_next(&self, count: u32) {
            self.failures_remaining.store(count, Ordering::SeqCst);
        }

        fn records_written(&self) -> usize {
            self.batches.lock().iter().map(Vec::len).sum()
        }
    }

    #[async_trait]
    impl RecordSink<PersistenceRecord> for MemorySink {
        async fn write_batch(&self, records: &[PersistenceRecord]) -> Result<(), SinkWriteError> {
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(SinkWriteError::new("injected failure"));
            }
            self.batches.lock().push(records.to_vec());
            Ok(())
        }
    }

    fn make_sampler(
        snap_every: Duration,
        threshold: usize,
    ) -> (
        Sampler<Arc<MemorySink>>,
        Arc<MemorySink>,
        watch::Sender<bool>,
    ) {
        let store = Arc::new(SymbolStateStore::new(&[Symbol::new("adabtc")], 5));
        let sink = Arc::new(MemorySink::default());
        let cache = BatchCache::new(threshold, Arc::clone(&sink));
        let (tx, rx) = watch::channel(true);
        let sampler = Sampler::new(store, cache, snap_every, rx, "binance_us");
        (sampler, sink, tx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_ticks_then_liveness_drop() {
        let (mut sampler, sink, tx) = make_sampler(Duration::from_secs(15), 1);
        assert_eq!(sampler.state(), SamplerState::Idle);

        let handle = tokio::spawn(async move {
            sampler.run().await;
            sampler
        });

        // Ticks fire at t=15s and t=30s; stop before the third.
        time::sleep(Duration::from_secs(31)).await;
        tx.send(false).unwrap();

        let sampler = handle.await.unwrap();
        assert_eq!(sampler.state(), SamplerState::Stopped);
        assert_eq!(sampler.ticks(), 2);
        assert_eq!(sink.records_written(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_first_period() {
        let (mut sampler, sink, tx) = make_sampler(Duration::from_secs(30), 1);

        let handle = tokio::spawn(async move {
            sampler.run().await;
            sampler
        });

        time::sleep(Duration::from_secs(10)).await;
        tx.send(false).unwrap();

        let sampler = handle.await.unwrap();
        assert_eq!(sampler.ticks(), 0);
        assert_eq!(sink.records_written(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_flush_drains_pending() {
        // Threshold far above tick count: nothing flushes during the
        // run, everything goes out in the final flush.
        let (mut sampler, sink, tx) = make_sampler(Duration::from_secs(15), 10);

        let handle = tokio::spawn(async move {
            sampler.run().await;
            sampler
        });

        time::sleep(Duration::from_secs(31)).await;
        tx.send(false).unwrap();

        let sampler = handle.await.unwrap();
        assert_eq!(sampler.ticks(), 2);
        assert_eq!(sink.records_written(), 2);
        assert_eq!(sink.batches.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_flush_retried_next_tick() {
        let (mut sampler, sink, tx) = make_sampler(Duration::from_secs(15), 1);
        sink.fail_next(1);

        let handle = tokio::spawn(async move {
            sampler.run().await;
            sampler
        });

        time::sleep(Duration::from_secs(31)).await;
        tx.send(false).unwrap();

        let sampler = handle.await.unwrap();
        assert_eq!(sampler.ticks(), 2);
        // First flush failed; second tick retried both records.
        assert_eq!(sink.records_written(), 2);
        let batches = sink.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[tokio::test]
    async fn test_busy_loop_mode_samples_and_stops() {
        let (mut sampler, sink, tx) = make_sampler(Duration::ZERO, 1);

        let handle = tokio::spawn(async move {
            sampler.run().await;
            sampler
        });

        // Let the busy loop take a few samples, then drop liveness.
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(false).unwrap();

        let sampler = handle.await.unwrap();
        assert_eq!(sampler.state(), SamplerState::Stopped);
        assert!(sampler.ticks() > 0);
        assert!(sink.records_written() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_records_are_snapshots() {
        let (mut sampler, sink, tx) = make_sampler(Duration::from_secs(15), 1);

        let handle = tokio::spawn(async move {
            sampler.run().await;
            sampler
        });

        time::sleep(Duration::from_secs(16)).await;
        tx.send(false).unwrap();
        handle.await.unwrap();

        let batches = sink.batches.lock();
        let record = &batches[0][0];
        assert_eq!(record.sub_source, "sampler");
        assert!(record.symbol.is_none());
        match &record.payload {
            RecordPayload::Snapshot(states) => {
                assert!(states.contains_key(&Symbol::new("adabtc")));
            }
            other => panic!("expected snapshot payload, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sender_drop_treated_as_disconnect() {
        let (mut sampler, _sink, tx) = make_sampler(Duration::from_secs(15), 1);

        let handle = tokio::spawn(async move {
            sampler.run().await;
            sampler
        });

        time::sleep(Duration::from_secs(1)).await;
        drop(tx);

        let sampler = handle.await.unwrap();
        assert_eq!(sampler.state(), SamplerState::Stopped);
    }
}
