//! Collector configuration
//!
//! Recognized options for the ingestion pipeline. Defaults mirror the
//! production deployment: trade streams only, a five-trade window, ten
//! book levels, a 30 second sample period, and per-record persistence.

use std::time::Duration;

use types::symbol::Symbol;

use crate::decode::StreamKind;

/// Configuration for the collector pipeline.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Symbols to track. Must be non-empty.
    pub symbols: Vec<Symbol>,
    /// Stream kinds to subscribe to via the multiplexed socket.
    pub streams: Vec<StreamKind>,
    /// Trade window capacity per symbol.
    pub trade_window: usize,
    /// Order book depth retained per side.
    pub book_depth: usize,
    /// Sample period. Zero means busy-loop sampling (debug mode).
    pub snap_every: Duration,
    /// Batch cache flush threshold.
    pub flush_threshold: usize,
    /// Source label stamped on every persisted record.
    pub source: String,
    /// Refresh interval passed to the feed's depth subscription.
    pub depth_refresh: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            streams: vec![StreamKind::Trade],
            trade_window: 5,
            book_depth: 10,
            snap_every: Duration::from_secs(30),
            flush_threshold: 1,
            source: "binance_us".to_string(),
            depth_refresh: Duration::from_secs(1800),
        }
    }
}

/// Errors raised by configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("symbol list must not be empty")]
    NoSymbols,

    #[error("trade window capacity must be positive")]
    ZeroTradeWindow,

    #[error("order book depth must be positive")]
    ZeroBookDepth,

    #[error("flush threshold must be positive")]
    ZeroFlushThreshold,
}

impl CollectorConfig {
    /// Convenience constructor for the common case: default options
    /// over a given symbol list.
    pub fn for_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Validate option ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        if self.trade_window == 0 {
            return Err(ConfigError::ZeroTradeWindow);
        }
        if self.book_depth == 0 {
            return Err(ConfigError::ZeroBookDepth);
        }
        if self.flush_threshold == 0 {
            return Err(ConfigError::ZeroFlushThreshold);
        }
        Ok(())
    }
}
