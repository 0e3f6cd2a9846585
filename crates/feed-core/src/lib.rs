//! Canonical, venue-independent market data types.
//!
//! Everything a downstream consumer sees is expressed with the types in this
//! crate: exchange-qualified symbols, exact-decimal price levels, and the
//! immutable event records published by the feed gateway.

pub mod clock;
pub mod events;
pub mod value_objects;

pub use value_objects::{
    BookSide, ExchangeId, InstrumentType, PriceLevel, QualifiedSymbol, Side, Symbol,
};

pub use events::{
    BalanceEvent, BookEventKind, FeedEvent, OrderBookEvent, OrderStatus, OrderStatusEvent,
    OrderType, RawPayload, TradeEvent,
};
