//! Per-symbol state store
//!
//! Holds, for each tracked symbol, a bounded FIFO window of recent
//! trades and the latest order book snapshot. Feed callbacks mutate it;
//! the sampler reads it via [`SymbolStateStore::snapshot_all`].
//!
//! Concurrency contract: each symbol's state sits behind its own mutex,
//! so a writer and the sampler can never interleave at field level
//! within one symbol, while updates to different symbols proceed
//! without mutual exclusion. The symbol map itself is fixed at
//! construction and never modified, so no outer lock is needed.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use types::book::OrderBookSnapshot;
use types::symbol::Symbol;
use types::trade::Trade;

/// Mutable per-symbol state: recent trades plus the latest book view.
///
/// The trade window never exceeds its capacity; eviction is strict
/// FIFO, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolState {
    trades: VecDeque<Trade>,
    orderbook: Option<OrderBookSnapshot>,
    capacity: usize,
}

impl SymbolState {
    /// Create empty state with the given trade window capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            trades: VecDeque::with_capacity(capacity),
            orderbook: None,
            capacity,
        }
    }

    /// Append a trade, evicting the oldest entry first when full.
    pub fn push_trade(&mut self, trade: Trade) {
        if self.trades.len() >= self.capacity {
            self.trades.pop_front();
        }
        self.trades.push_back(trade);
    }

    /// Replace the stored order book snapshot wholesale.
    pub fn replace_orderbook(&mut self, snapshot: OrderBookSnapshot) {
        self.orderbook = Some(snapshot);
    }

    /// Trades currently in the window, oldest first.
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter()
    }

    /// Number of trades currently held.
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    /// Configured window capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Latest order book snapshot, if one has arrived.
    pub fn orderbook(&self) -> Option<&OrderBookSnapshot> {
        self.orderbook.as_ref()
    }
}

/// Store of per-symbol state for a fixed, pre-declared symbol set.
///
/// Uses `BTreeMap` for deterministic iteration order in snapshots.
pub struct SymbolStateStore {
    states: BTreeMap<Symbol, Mutex<SymbolState>>,
}

impl SymbolStateStore {
    /// Create a store tracking exactly the given symbols.
    pub fn new(symbols: &[Symbol], trade_window: usize) -> Self {
        let states = symbols
            .iter()
            .map(|s| (s.clone(), Mutex::new(SymbolState::new(trade_window))))
            .collect();
        Self { states }
    }

    /// Record a trade for a symbol.
    ///
    /// A late or duplicate subscription can deliver messages for a
    /// symbol outside the configured set; that is a warn-and-ignore
    /// no-op, never a crash.
    pub fn on_trade(&self, symbol: &Symbol, trade: Trade) {
        match self.states.get(symbol) {
            Some(state) => state.lock().push_trade(trade),
            None => warn!(symbol = %symbol, "trade for untracked symbol ignored"),
        }
    }

    /// Replace a symbol's order book snapshot.
    pub fn on_orderbook(&self, symbol: &Symbol, snapshot: OrderBookSnapshot) {
        match self.states.get(symbol) {
            Some(state) => state.lock().replace_orderbook(snapshot),
            None => warn!(symbol = %symbol, "order book for untracked symbol ignored"),
        }
    }

    /// Deep, independent copy of the current state for every symbol.
    ///
    /// Each symbol's mutex is held across its clone, so the copy is
    /// internally consistent per symbol. No cross-symbol atomicity is
    /// promised (or needed).
    pub fn snapshot_all(&self) -> BTreeMap<Symbol, SymbolState> {
        self.states
            .iter()
            .map(|(symbol, state)| (symbol.clone(), state.lock().clone()))
            .collect()
    }
}
