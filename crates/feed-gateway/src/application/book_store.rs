use dashmap::DashMap;
use feed_core::ExchangeId;

use crate::domain::{BookDelta, BookSnapshot, LevelChange, OrderBook};

/// Authoritative in-memory books for one venue, keyed by canonical symbol.
///
/// Each operation holds the symbol's map shard lock for its whole duration,
/// so readers see either the pre- or the post-mutation book. Callers
/// serialize writers per symbol.
pub struct OrderBookStore {
    exchange: ExchangeId,
    max_depth: Option<usize>,
    books: DashMap<String, OrderBook>,
}

impl OrderBookStore {
    pub fn new(exchange: impl Into<ExchangeId>, max_depth: Option<usize>) -> Self {
        OrderBookStore {
            exchange: exchange.into(),
            max_depth,
            books: DashMap::new(),
        }
    }

    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    /// Copy of the current book
    pub fn get(&self, symbol: &str) -> Option<OrderBook> {
        self.books.get(symbol).map(|b| b.value().clone())
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    /// Run `f` against the book without copying it
    pub fn with_book<R>(&self, symbol: &str, f: impl FnOnce(&OrderBook) -> R) -> Option<R> {
        self.books.get(symbol).map(|b| f(b.value()))
    }

    /// Replace all levels and the cursor, creating the book if needed
    pub fn replace_with_snapshot(&self, symbol: &str, snapshot: &BookSnapshot, receipt_ms: i64) {
        let mut book = self
            .books
            .entry(symbol.to_string())
            .or_insert_with(|| OrderBook::new(self.exchange.clone(), symbol, self.max_depth));
        book.replace_with_snapshot(snapshot, receipt_ms);
    }

    /// Apply the delta's pairs and advance the cursor to its end.
    ///
    /// Returns the effective changes, or `None` when there is no book.
    pub fn apply_delta(&self, delta: &BookDelta, receipt_ms: i64) -> Option<Vec<LevelChange>> {
        let mut book = self.books.get_mut(&delta.symbol)?;
        let changes = book.apply_changes(&delta.changes);
        if let Some(range) = delta.sequence {
            book.set_sequence(Some(range.end));
        }
        book.record_timestamps(delta.exchange_timestamp_ms, receipt_ms);
        Some(changes)
    }

    pub fn remove(&self, symbol: &str) -> bool {
        self.books.remove(symbol).is_some()
    }

    /// Symbols with a book, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.books.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
