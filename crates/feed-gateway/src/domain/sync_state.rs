use super::records::{SequenceRange, SnapshotRequest};

/// Sync state for a symbol's order book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No book and no snapshot requested yet
    Uninitialized,
    /// Waiting for a bootstrap snapshot; deltas are discarded
    SnapshotPending,
    /// Book installed, applying deltas
    Synced,
    /// Unsubscribed or reset; deltas are ignored
    Closed,
}

impl SyncState {
    /// Check if the book can be read and published
    pub fn is_ready(&self) -> bool {
        matches!(self, SyncState::Synced)
    }

    /// Check if the symbol needs a snapshot before deltas apply
    pub fn needs_snapshot(&self) -> bool {
        matches!(self, SyncState::Uninitialized | SyncState::SnapshotPending)
    }
}

/// What to do with an incoming delta
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaAction {
    /// Apply the pairs; the cursor has already been advanced
    Apply,
    /// `sequence_end` is behind the cursor
    Stale { cursor: u64, end: u64 },
    /// Discontinuity; the symbol is pending again and a fetch must be issued
    Gap {
        cursor: u64,
        start: u64,
        request: SnapshotRequest,
    },
    /// No book yet, or the last fetch failed; a fetch must be issued
    Fetch(SnapshotRequest),
    /// A snapshot is already in flight
    Pending,
    /// Symbol is closed
    Ignore,
}

/// What to do with a snapshot result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotAction {
    /// Install the snapshot; the symbol is now synced
    Install,
    /// Epoch is stale or no snapshot was expected
    Discard,
    /// Fetch failed; the symbol stays pending until the next delta
    Failed,
}

/// Per-symbol synchronization state machine.
///
/// Pure bookkeeping: it decides, the synchronizer performs the I/O and book
/// mutation. `fetch_in_flight` guarantees at most one outstanding snapshot
/// per symbol; `epoch` invalidates results issued before a reset.
#[derive(Debug, Clone)]
pub struct SymbolSync {
    symbol: String,
    state: SyncState,
    epoch: u64,
    cursor: Option<u64>,
    fetch_in_flight: bool,
}

impl SymbolSync {
    pub fn new(symbol: impl Into<String>) -> Self {
        SymbolSync {
            symbol: symbol.into(),
            state: SyncState::Uninitialized,
            epoch: 0,
            cursor: None,
            fetch_in_flight: false,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.fetch_in_flight
    }

    fn request_fetch(&mut self) -> SnapshotRequest {
        self.fetch_in_flight = true;
        SnapshotRequest {
            symbol: self.symbol.clone(),
            epoch: self.epoch,
        }
    }

    /// Explicit subscribe. Returns a fetch to issue, if one is needed.
    pub fn on_subscribe(&mut self) -> Option<SnapshotRequest> {
        match self.state {
            SyncState::Uninitialized | SyncState::Closed => {
                self.state = SyncState::SnapshotPending;
                self.cursor = None;
                Some(self.request_fetch())
            }
            SyncState::SnapshotPending if !self.fetch_in_flight => Some(self.request_fetch()),
            SyncState::SnapshotPending | SyncState::Synced => None,
        }
    }

    /// Classify a delta. Unsequenced deltas apply whenever the symbol is
    /// synced.
    pub fn on_delta(&mut self, sequence: Option<SequenceRange>) -> DeltaAction {
        match self.state {
            SyncState::Closed => DeltaAction::Ignore,
            SyncState::Uninitialized => {
                self.state = SyncState::SnapshotPending;
                DeltaAction::Fetch(self.request_fetch())
            }
            SyncState::SnapshotPending => {
                if self.fetch_in_flight {
                    DeltaAction::Pending
                } else {
                    DeltaAction::Fetch(self.request_fetch())
                }
            }
            SyncState::Synced => match (sequence, self.cursor) {
                (Some(range), Some(cursor)) => {
                    if range.end < cursor {
                        DeltaAction::Stale {
                            cursor,
                            end: range.end,
                        }
                    } else if range.start > cursor.saturating_add(1) {
                        self.state = SyncState::SnapshotPending;
                        self.cursor = None;
                        DeltaAction::Gap {
                            cursor,
                            start: range.start,
                            request: self.request_fetch(),
                        }
                    } else {
                        self.cursor = Some(range.end);
                        DeltaAction::Apply
                    }
                }
                (Some(range), None) => {
                    self.cursor = Some(range.end);
                    DeltaAction::Apply
                }
                (None, _) => DeltaAction::Apply,
            },
        }
    }

    /// Snapshot arrived for the fetch issued in `epoch`
    pub fn on_snapshot_loaded(&mut self, epoch: u64, sequence: Option<u64>) -> SnapshotAction {
        if !self.expects_snapshot(epoch) {
            return SnapshotAction::Discard;
        }
        self.fetch_in_flight = false;
        self.state = SyncState::Synced;
        self.cursor = sequence;
        SnapshotAction::Install
    }

    /// Fetch issued in `epoch` failed
    pub fn on_snapshot_failed(&mut self, epoch: u64) -> SnapshotAction {
        if !self.expects_snapshot(epoch) {
            return SnapshotAction::Discard;
        }
        self.fetch_in_flight = false;
        SnapshotAction::Failed
    }

    fn expects_snapshot(&self, epoch: u64) -> bool {
        epoch == self.epoch && self.state == SyncState::SnapshotPending && self.fetch_in_flight
    }

    /// Unsubscribe or connection reset
    pub fn close(&mut self) {
        self.state = SyncState::Closed;
        self.epoch += 1;
        self.cursor = None;
        self.fetch_in_flight = false;
    }
}
