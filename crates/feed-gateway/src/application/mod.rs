pub mod book_store;
pub mod config;
pub mod dispatcher;
pub mod feed_manager;
pub mod synchronizer;

pub use book_store::OrderBookStore;
pub use config::MarketDataConfig;
pub use dispatcher::{Dispatched, MessageDispatcher};
pub use feed_manager::{FeedManager, VenueSynchronizer, shard_symbols};
pub use synchronizer::{BookSynchronizer, DeltaOutcome, SnapshotOutcome};
