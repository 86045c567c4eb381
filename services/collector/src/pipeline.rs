//! Ingestion pipeline orchestrator
//!
//! Wires decoded feed messages into symbol state mutation and owns the
//! lifecycle of the sampler and the feed subscriptions. Feed callbacks
//! run decode → state mutation and return promptly; they never touch
//! persistence. Stopping closes the feed, which flips the liveness
//! signal false and drains the sampler to its terminal state.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use types::symbol::Symbol;

use crate::cache::BatchCache;
use crate::config::{CollectorConfig, ConfigError};
use crate::decode::{self, StreamKind};
use crate::record::{PersistenceRecord, RecordSink};
use crate::sampler::Sampler;
use crate::state::SymbolStateStore;

/// Callback invoked by the feed with one raw decoded-from-wire payload.
///
/// Runs on a thread/context owned by the feed, so it must be cheap and
/// must never block on persistence.
pub type RawHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// Errors surfaced by the external feed collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("subscription failed for `{stream}`: {reason}")]
    SubscriptionFailed { stream: String, reason: String },

    /// Connection lost. Raised by feed implementations; the collector
    /// itself observes disconnects through the liveness signal.
    #[error("feed disconnected")]
    Disconnected,
}

/// External real-time message source.
///
/// Implementations own connection handling (sockets, reconnects,
/// heartbeats); the collector only registers callbacks and watches the
/// connection-alive signal.
pub trait MarketFeed: Send + Sync {
    /// Subscribe one handler to a set of multiplexed streams
    /// (`"<symbol>@trade"`, ...).
    fn subscribe_multiplex(&self, streams: &[String], handler: RawHandler)
        -> Result<(), FeedError>;

    /// Subscribe a per-symbol order book stream at the given depth and
    /// refresh interval.
    fn subscribe_depth(
        &self,
        symbol: &Symbol,
        depth: usize,
        refresh: Duration,
        handler: RawHandler,
    ) -> Result<(), FeedError>;

    /// Connection-alive signal. Flips false on disconnect or close.
    fn liveness(&self) -> watch::Receiver<bool>;

    /// Whether the underlying connection is currently open.
    fn is_alive(&self) -> bool {
        *self.liveness().borrow()
    }

    /// Close the connection, unsubscribing everything.
    fn close(&self);
}

/// Errors raised by pipeline lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("pipeline already started")]
    AlreadyStarted,

    #[error("pipeline not started")]
    NotStarted,

    #[error("sampler task failed: {0}")]
    SamplerJoin(String),
}

/// Orchestrator owning feed subscriptions, the state store, and the
/// sampler task. Library entry point consumed by a thin launcher.
pub struct CollectorPipeline<F, S> {
    config: CollectorConfig,
    feed: Arc<F>,
    store: Arc<SymbolStateStore>,
    sink: Option<S>,
    sampler_task: Option<JoinHandle<Sampler<S>>>,
}

impl<F, S> CollectorPipeline<F, S>
where
    F: MarketFeed,
    S: RecordSink<PersistenceRecord> + 'static,
{
    /// Create a pipeline over a validated configuration.
    pub fn new(config: CollectorConfig, feed: Arc<F>, sink: S) -> Result<Self, PipelineError> {
        config.validate()?;
        let store = Arc::new(SymbolStateStore::new(&config.symbols, config.trade_window));
        Ok(Self {
            config,
            feed,
            store,
            sink: Some(sink),
            sampler_task: None,
        })
    }

    /// Shared handle to the symbol state store.
    pub fn store(&self) -> Arc<SymbolStateStore> {
        Arc::clone(&self.store)
    }

    /// Register feed handlers and start the sampler.
    ///
    /// One multiplexed handler covers all trade streams; order book
    /// streams get one handler per symbol. The sink is consumed only
    /// once every subscription has succeeded, so a failed start leaves
    /// the pipeline startable.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.sink.is_none() {
            return Err(PipelineError::AlreadyStarted);
        }

        if self.config.streams.contains(&StreamKind::Trade) {
            let streams: Vec<String> = self
                .config
                .symbols
                .iter()
                .map(|s| s.stream(StreamKind::Trade.as_str()))
                .collect();
            self.feed
                .subscribe_multiplex(&streams, self.multiplex_handler())?;
            info!(streams = streams.len(), "multiplex trade subscription registered");
        }

        if self.config.streams.contains(&StreamKind::Depth) {
            for symbol in &self.config.symbols {
                self.feed.subscribe_depth(
                    symbol,
                    self.config.book_depth,
                    self.config.depth_refresh,
                    self.depth_handler(symbol.clone()),
                )?;
            }
            info!(
                symbols = self.config.symbols.len(),
                depth = self.config.book_depth,
                "depth subscriptions registered"
            );
        }

        let sink = self.sink.take().ok_or(PipelineError::AlreadyStarted)?;
        let cache = BatchCache::new(self.config.flush_threshold, sink);
        let mut sampler = Sampler::new(
            Arc::clone(&self.store),
            cache,
            self.config.snap_every,
            self.feed.liveness(),
            self.config.source.clone(),
        );
        self.sampler_task = Some(tokio::spawn(async move {
            sampler.run().await;
            sampler
        }));

        info!(source = %self.config.source, "collector pipeline started");
        Ok(())
    }

    /// Close the feed and wait for the sampler to drain.
    ///
    /// Closing flips the liveness signal false; the sampler exits
    /// within one tick period, performs its final flush, and stops.
    pub async fn stop(&mut self) -> Result<(), PipelineError> {
        let task = self.sampler_task.take().ok_or(PipelineError::NotStarted)?;
        self.feed.close();

        match task.await {
            Ok(sampler) => {
                info!(ticks = sampler.ticks(), "collector pipeline stopped");
                Ok(())
            }
            Err(err) => Err(PipelineError::SamplerJoin(err.to_string())),
        }
    }

    /// Handler for the multiplexed trade socket: classify, decode,
    /// mutate state. Per-message failures are logged and isolated.
    fn multiplex_handler(&self) -> RawHandler {
        let store = Arc::clone(&self.store);
        Arc::new(move |raw: Value| match decode::classify(&raw) {
            Ok((symbol, StreamKind::Trade, payload)) => match decode::decode_trade(payload) {
                Ok(trade) => store.on_trade(&symbol, trade),
                Err(err) => {
                    warn!(symbol = %symbol, error = %err, "dropping malformed trade message");
                }
            },
            Ok((symbol, kind, _)) => {
                debug!(symbol = %symbol, kind = ?kind, "ignoring non-trade stream on multiplex socket");
            }
            Err(err) => warn!(error = %err, "dropping unclassifiable feed message"),
        })
    }

    /// Handler for one symbol's depth stream.
    fn depth_handler(&self, symbol: Symbol) -> RawHandler {
        let store = Arc::clone(&self.store);
        let depth = self.config.book_depth;
        Arc::new(move |raw: Value| match decode::decode_orderbook(&raw, depth) {
            Ok(book) => store.on_orderbook(&symbol, book),
            Err(err) => {
                warn!(symbol = %symbol, error = %err, "dropping malformed depth message");
            }
        })
    }
}
