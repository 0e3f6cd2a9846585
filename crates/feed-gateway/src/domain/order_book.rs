use feed_core::{BookEventKind, BookSide, ExchangeId, OrderBookEvent, PriceLevel, RawPayload};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::records::{BookSnapshot, LevelChange};

/// Level-2 book for one venue symbol.
///
/// Zero-size levels are never stored. The full ladder is kept so the book
/// stays faithful when a top level is removed; `max_depth` only bounds what
/// is read out and published.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBook {
    exchange: ExchangeId,
    symbol: String,
    bids: BTreeMap<Decimal, Decimal>,
    asks: BTreeMap<Decimal, Decimal>,
    sequence: Option<u64>,
    last_exchange_timestamp_ms: Option<i64>,
    last_receipt_timestamp_ms: i64,
    max_depth: Option<usize>,
}

impl OrderBook {
    pub fn new(exchange: ExchangeId, symbol: impl Into<String>, max_depth: Option<usize>) -> Self {
        OrderBook {
            exchange,
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            sequence: None,
            last_exchange_timestamp_ms: None,
            last_receipt_timestamp_ms: 0,
            max_depth,
        }
    }

    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Sequence cursor: last venue sequence reflected in this book
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn last_exchange_timestamp_ms(&self) -> Option<i64> {
        self.last_exchange_timestamp_ms
    }

    pub fn last_receipt_timestamp_ms(&self) -> i64 {
        self.last_receipt_timestamp_ms
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Discard all levels and the cursor, then install the snapshot
    pub fn replace_with_snapshot(&mut self, snapshot: &BookSnapshot, receipt_ms: i64) {
        self.bids.clear();
        self.asks.clear();

        for level in &snapshot.bids {
            if !level.size.is_zero() {
                self.bids.insert(level.price, level.size);
            }
        }
        for level in &snapshot.asks {
            if !level.size.is_zero() {
                self.asks.insert(level.price, level.size);
            }
        }

        self.sequence = snapshot.sequence;
        self.last_exchange_timestamp_ms = snapshot.exchange_timestamp_ms;
        self.last_receipt_timestamp_ms = receipt_ms;
    }

    /// Apply price/size pairs in order and return the changes that altered
    /// the visible book.
    ///
    /// With a depth bound this is the difference between the top levels
    /// before and after: a level pushed out of the window is reported with
    /// size zero, and a deeper level promoted into it with its size.
    pub fn apply_changes(&mut self, changes: &[LevelChange]) -> Vec<LevelChange> {
        let before = self.max_depth.map(|_| (self.bids(), self.asks()));
        let mut effective = Vec::with_capacity(changes.len());

        for change in changes {
            let side = match change.side {
                BookSide::Bid => &mut self.bids,
                BookSide::Ask => &mut self.asks,
            };

            if change.size.is_zero() {
                if side.remove(&change.price).is_some() {
                    effective.push(*change);
                }
            } else if side.insert(change.price, change.size) != Some(change.size) {
                effective.push(*change);
            }
        }

        match before {
            Some((bids, asks)) if !effective.is_empty() => {
                let mut visible = window_diff(BookSide::Bid, &bids, &self.bids());
                visible.extend(window_diff(BookSide::Ask, &asks, &self.asks()));
                visible
            }
            Some(_) => Vec::new(),
            None => effective,
        }
    }

    pub fn set_sequence(&mut self, sequence: Option<u64>) {
        self.sequence = sequence;
    }

    pub fn record_timestamps(&mut self, exchange_ms: Option<i64>, receipt_ms: i64) {
        if exchange_ms.is_some() {
            self.last_exchange_timestamp_ms = exchange_ms;
        }
        self.last_receipt_timestamp_ms = receipt_ms;
    }

    fn visible(&self) -> usize {
        self.max_depth.unwrap_or(usize::MAX)
    }

    /// Bids best-first (descending price), bounded by `max_depth`
    pub fn bids(&self) -> Vec<PriceLevel> {
        self.top_bids(self.visible())
    }

    /// Asks best-first (ascending price), bounded by `max_depth`
    pub fn asks(&self) -> Vec<PriceLevel> {
        self.top_asks(self.visible())
    }

    /// Size at `price` anywhere in the ladder, including below the window
    pub fn bid_size(&self, price: Decimal) -> Option<Decimal> {
        self.bids.get(&price).copied()
    }

    pub fn ask_size(&self, price: Decimal) -> Option<Decimal> {
        self.asks.get(&price).copied()
    }

    /// Get the best bid (highest buy price)
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids
            .iter()
            .next_back()
            .map(|(p, s)| PriceLevel::new(*p, *s))
    }

    /// Get the best ask (lowest sell price)
    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.iter().next().map(|(p, s)| PriceLevel::new(*p, *s))
    }

    pub fn mid_price(&self) -> Option<Decimal> {
        let bid = self.bids.keys().next_back()?;
        let ask = self.asks.keys().next()?;
        Some((*bid + *ask) / Decimal::TWO)
    }

    pub fn spread(&self) -> Option<Decimal> {
        let bid = self.bids.keys().next_back()?;
        let ask = self.asks.keys().next()?;
        Some(*ask - *bid)
    }

    /// Get top N bid levels
    pub fn top_bids(&self, n: usize) -> Vec<PriceLevel> {
        self.bids
            .iter()
            .rev()
            .take(n)
            .map(|(p, s)| PriceLevel::new(*p, *s))
            .collect()
    }

    /// Get top N ask levels
    pub fn top_asks(&self, n: usize) -> Vec<PriceLevel> {
        self.asks
            .iter()
            .take(n)
            .map(|(p, s)| PriceLevel::new(*p, *s))
            .collect()
    }

    /// Visible levels per side
    pub fn depth(&self) -> (usize, usize) {
        let visible = self.visible();
        (self.bids.len().min(visible), self.asks.len().min(visible))
    }

    /// Levels held per side, including those below the window
    pub fn ladder_depth(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Full-book event reflecting the current state
    pub fn snapshot_event(&self, raw: Option<RawPayload>) -> OrderBookEvent {
        OrderBookEvent {
            exchange: self.exchange.clone(),
            symbol: self.symbol.clone(),
            kind: BookEventKind::Snapshot,
            bids: self.bids(),
            asks: self.asks(),
            sequence: self.sequence,
            exchange_timestamp_ms: self.last_exchange_timestamp_ms,
            receipt_timestamp_ms: self.last_receipt_timestamp_ms,
            raw,
        }
    }

    /// Incremental event carrying the given effective changes
    pub fn delta_event(&self, changes: &[LevelChange], raw: Option<RawPayload>) -> OrderBookEvent {
        let mut bids = Vec::new();
        let mut asks = Vec::new();
        for change in changes {
            match change.side {
                BookSide::Bid => bids.push(change.level()),
                BookSide::Ask => asks.push(change.level()),
            }
        }

        OrderBookEvent {
            exchange: self.exchange.clone(),
            symbol: self.symbol.clone(),
            kind: BookEventKind::Delta,
            bids,
            asks,
            sequence: self.sequence,
            exchange_timestamp_ms: self.last_exchange_timestamp_ms,
            receipt_timestamp_ms: self.last_receipt_timestamp_ms,
            raw,
        }
    }
}

/// Changes that turn the `before` window into `after`, best price first
fn window_diff(side: BookSide, before: &[PriceLevel], after: &[PriceLevel]) -> Vec<LevelChange> {
    let mut changes = Vec::new();
    for old in before {
        if !after.iter().any(|l| l.price == old.price) {
            changes.push(LevelChange::new(side, old.price, Decimal::ZERO));
        }
    }
    for new in after {
        if !before.contains(new) {
            changes.push(LevelChange::new(side, new.price, new.size));
        }
    }
    changes
}
