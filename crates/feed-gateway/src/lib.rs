//! Feed Gateway Crate
//!
//! Multi-venue market data gateway that keeps exact, sequence-checked order
//! books and republishes venue feeds as canonical events.
//!
//! # Architecture
//!
//! The gateway:
//! - Connects to venues via WebSocket, bootstraps books via REST
//! - Translates venue frames through a per-venue adapter
//! - Detects sequence gaps and stale deltas, resyncing from a fresh snapshot
//! - Publishes book, trade, order and balance events to subscribers
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │   KuCoin    │     │   Vertex    │
//! └──────┬──────┘     └──────┬──────┘
//!        │ WebSocket         │
//!        ▼                   ▼
//! ┌──────────────────────────────────────────────┐
//! │                  FeedManager                  │
//! │  ┌─────────────┐        ┌─────────────┐       │
//! │  │ Connection  │  ...   │ Connection  │       │
//! │  └──────┬──────┘        └──────┬──────┘       │
//! │         ▼                      ▼              │
//! │  ┌────────────────────────────────────────┐   │
//! │  │  MessageDispatcher (VenueAdapter)      │   │
//! │  └──────┬──────────────────────────┬──────┘   │
//! │         ▼ deltas                   │ trades,  │
//! │  ┌──────────────────┐   REST       │ orders,  │
//! │  │ BookSynchronizer │◄── snapshots │ balances │
//! │  │ + OrderBookStore │              │          │
//! │  └──────┬───────────┘              │          │
//! │         ▼                          ▼          │
//! │  ┌────────────────────────────────────────┐   │
//! │  │            EventPublisher              │   │
//! │  └────────────────────────────────────────┘   │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!                 ┌─────────────┐
//!                 │ Subscribers │
//!                 └─────────────┘
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export key types
pub use domain::{
    BookDelta, BookSnapshot, Channel, FeedError, FetchError, LevelChange, OrderBook,
    ParseError, SequenceRange, SnapshotFetcher, SymbolRegistry, SyncState, VenueAdapter,
};

pub use application::{
    BookSynchronizer, DeltaOutcome, FeedManager, MarketDataConfig, MessageDispatcher,
    OrderBookStore, SnapshotOutcome,
};

pub use infrastructure::{
    KucoinAdapter, RestClient, RestError, RestSnapshotFetcher, VertexAdapter, WsClient,
    WsRequestSender,
};

pub use presentation::{EventPublisher, EventSubscriber, SubscriberError};

pub use config::{
    ConfigError, ExchangeConfig, GatewayConfigFile, load_config, load_default_config,
};
