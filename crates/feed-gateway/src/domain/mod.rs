mod error;
mod events;
mod order_book;
mod records;
mod symbols;
mod sync_state;
mod traits;

pub use error::{FeedError, FetchError, ParseError};
pub use events::WsEvent;
pub use order_book::OrderBook;
pub use records::{
    BookDelta, BookSnapshot, Channel, Envelope, LevelChange, SequenceRange, SnapshotRequest,
};
pub use symbols::{RegistryError, SymbolRegistry};
pub use sync_state::{DeltaAction, SnapshotAction, SymbolSync, SyncState};
pub use traits::{SnapshotFetcher, VenueAdapter};
