use dashmap::DashMap;
use feed_core::{ExchangeId, clock};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::domain::{
    BookDelta, BookSnapshot, DeltaAction, FetchError, OrderBook, SnapshotAction, SnapshotFetcher,
    SnapshotRequest, SymbolSync, SyncState,
};
use crate::presentation::EventPublisher;

use super::book_store::OrderBookStore;

/// Result of feeding one delta to the synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Applied; `changes` levels actually moved
    Applied { changes: usize },
    /// Already reflected in the book
    Stale,
    /// Sequence gap; a resync fetch was issued
    Gap,
    /// No book yet; discarded
    Pending,
    /// Symbol is closed
    Ignored,
}

/// Result of delivering a snapshot fetch result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Installed,
    /// Stale epoch or not expected
    Discarded,
    Failed(FetchError),
}

/// Gap-detecting book synchronizer for one venue.
///
/// Each symbol has its own lock; every mutation of that symbol's book and
/// every event emitted for it happens under the lock, so one symbol never
/// has two writers and its events leave in application order. Snapshot
/// fetches run on spawned tasks and re-enter through [`on_snapshot`].
///
/// Generic over `F`: SnapshotFetcher, the REST collaborator.
///
/// [`on_snapshot`]: BookSynchronizer::on_snapshot
pub struct BookSynchronizer<F>
where
    F: SnapshotFetcher + 'static,
{
    exchange: ExchangeId,
    fetcher: Arc<F>,
    store: Arc<OrderBookStore>,
    publisher: EventPublisher,
    symbols: DashMap<String, Arc<Mutex<SymbolSync>>>,
}

impl<F> BookSynchronizer<F>
where
    F: SnapshotFetcher + 'static,
{
    pub fn new(
        exchange: impl Into<ExchangeId>,
        fetcher: Arc<F>,
        max_depth: Option<usize>,
        publisher: EventPublisher,
    ) -> Self {
        let exchange = exchange.into();
        BookSynchronizer {
            store: Arc::new(OrderBookStore::new(exchange.clone(), max_depth)),
            exchange,
            fetcher,
            publisher,
            symbols: DashMap::new(),
        }
    }

    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    pub fn store(&self) -> &Arc<OrderBookStore> {
        &self.store
    }

    fn entry(&self, symbol: &str) -> Arc<Mutex<SymbolSync>> {
        Arc::clone(
            self.symbols
                .entry(symbol.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(SymbolSync::new(symbol))))
                .value(),
        )
    }

    fn existing(&self, symbol: &str) -> Option<Arc<Mutex<SymbolSync>>> {
        self.symbols.get(symbol).map(|e| Arc::clone(e.value()))
    }

    /// Start synchronizing a symbol. Issues a snapshot fetch unless one is
    /// already outstanding or the book is synced.
    pub fn subscribe(self: &Arc<Self>, symbol: &str) {
        let request = self.entry(symbol).lock().on_subscribe();
        if let Some(request) = request {
            tracing::debug!("{}:{} subscribed, requesting snapshot", self.exchange, symbol);
            self.spawn_fetch(request);
        }
    }

    /// Stop synchronizing a symbol: close it, bump its epoch, drop its book
    pub fn unsubscribe(&self, symbol: &str) {
        if let Some(entry) = self.existing(symbol) {
            let mut sync = entry.lock();
            sync.close();
            self.store.remove(symbol);
        }
    }

    /// Close every symbol, e.g. after the connection dropped. Returns the
    /// symbols that were open.
    pub fn reset_all(&self) -> Vec<String> {
        let entries: Vec<(String, Arc<Mutex<SymbolSync>>)> = self
            .symbols
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        self.close_entries(entries)
    }

    /// Close the given symbols only. Returns those that were open.
    pub fn reset_symbols(&self, symbols: &[String]) -> Vec<String> {
        let entries: Vec<(String, Arc<Mutex<SymbolSync>>)> = symbols
            .iter()
            .filter_map(|s| self.existing(s).map(|e| (s.clone(), e)))
            .collect();
        self.close_entries(entries)
    }

    fn close_entries(&self, entries: Vec<(String, Arc<Mutex<SymbolSync>>)>) -> Vec<String> {
        let mut reset = Vec::new();
        for (symbol, entry) in entries {
            let mut sync = entry.lock();
            if sync.state() != SyncState::Closed {
                sync.close();
                self.store.remove(&symbol);
                reset.push(symbol);
            }
        }
        reset.sort();
        reset
    }

    /// Feed one delta. Never blocks on I/O.
    pub fn on_delta(self: &Arc<Self>, delta: BookDelta, receipt_ms: i64) -> DeltaOutcome {
        let entry = self.entry(&delta.symbol);
        let mut sync = entry.lock();

        match sync.on_delta(delta.sequence) {
            DeltaAction::Apply => {
                let Some(changes) = self.store.apply_delta(&delta, receipt_ms) else {
                    tracing::error!(
                        "{}:{} synced without a book, resetting",
                        self.exchange,
                        delta.symbol
                    );
                    sync.close();
                    return DeltaOutcome::Ignored;
                };

                if !changes.is_empty() {
                    let event = self.store.with_book(&delta.symbol, |book| {
                        book.delta_event(&changes, delta.raw.clone())
                    });
                    if let Some(event) = event {
                        self.publisher.publish(event);
                    }
                }
                DeltaOutcome::Applied {
                    changes: changes.len(),
                }
            }
            DeltaAction::Stale { cursor, end } => {
                tracing::trace!(
                    "{}:{} stale delta ending {} behind cursor {}",
                    self.exchange,
                    delta.symbol,
                    end,
                    cursor
                );
                DeltaOutcome::Stale
            }
            DeltaAction::Gap {
                cursor,
                start,
                request,
            } => {
                tracing::warn!(
                    "{}:{} sequence gap: expected {}, got {}, resyncing",
                    self.exchange,
                    delta.symbol,
                    cursor.saturating_add(1),
                    start
                );
                self.store.remove(&delta.symbol);
                drop(sync);
                self.spawn_fetch(request);
                DeltaOutcome::Gap
            }
            DeltaAction::Fetch(request) => {
                drop(sync);
                self.spawn_fetch(request);
                DeltaOutcome::Pending
            }
            DeltaAction::Pending => {
                tracing::trace!("{}:{} snapshot pending, delta discarded", self.exchange, delta.symbol);
                DeltaOutcome::Pending
            }
            DeltaAction::Ignore => DeltaOutcome::Ignored,
        }
    }

    /// Deliver a snapshot fetch result into the symbol's single-writer context
    pub fn on_snapshot(
        &self,
        request: &SnapshotRequest,
        result: Result<BookSnapshot, FetchError>,
    ) -> SnapshotOutcome {
        let Some(entry) = self.existing(&request.symbol) else {
            return SnapshotOutcome::Discarded;
        };
        let mut sync = entry.lock();

        match result {
            Ok(snapshot) => match sync.on_snapshot_loaded(request.epoch, snapshot.sequence) {
                SnapshotAction::Install => {
                    self.store
                        .replace_with_snapshot(&request.symbol, &snapshot, clock::now_millis());
                    let event = self
                        .store
                        .with_book(&request.symbol, |book| book.snapshot_event(snapshot.raw.clone()));
                    if let Some(event) = event {
                        self.publisher.publish(event);
                    }
                    tracing::info!(
                        "{}:{} synced at sequence {:?}",
                        self.exchange,
                        request.symbol,
                        snapshot.sequence
                    );
                    SnapshotOutcome::Installed
                }
                _ => {
                    tracing::debug!(
                        "{}:{} discarding snapshot from epoch {}",
                        self.exchange,
                        request.symbol,
                        request.epoch
                    );
                    SnapshotOutcome::Discarded
                }
            },
            Err(e) => match sync.on_snapshot_failed(request.epoch) {
                SnapshotAction::Failed => {
                    tracing::warn!(
                        "{}:{} snapshot fetch failed, waiting for next delta: {}",
                        self.exchange,
                        request.symbol,
                        e
                    );
                    SnapshotOutcome::Failed(e)
                }
                _ => SnapshotOutcome::Discarded,
            },
        }
    }

    fn spawn_fetch(self: &Arc<Self>, request: SnapshotRequest) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.fetcher.fetch_snapshot(&request.symbol).await;
            this.on_snapshot(&request, result);
        });
    }

    /// Get sync state for a symbol
    pub fn state(&self, symbol: &str) -> SyncState {
        self.existing(symbol)
            .map(|e| e.lock().state())
            .unwrap_or(SyncState::Uninitialized)
    }

    pub fn epoch(&self, symbol: &str) -> Option<u64> {
        self.existing(symbol).map(|e| e.lock().epoch())
    }

    /// Copy of a symbol's book; `None` unless synced
    pub fn book(&self, symbol: &str) -> Option<OrderBook> {
        self.store.get(symbol)
    }

    /// Check if all known symbols are synced
    pub fn all_synced(&self) -> bool {
        self.symbols
            .iter()
            .all(|e| e.value().lock().state() == SyncState::Synced)
    }

    /// Get list of symbols that are not synced
    pub fn unsynced_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .symbols
            .iter()
            .filter(|e| e.value().lock().state() != SyncState::Synced)
            .map(|e| e.key().clone())
            .collect();
        symbols.sort();
        symbols
    }
}
