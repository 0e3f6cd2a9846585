//! Infrastructure Layer - Inbound adapters from venues
//!
//! - RestClient / RestSnapshotFetcher: HTTP snapshots and balance listings
//! - WsClient: WebSocket stream connections
//! - adapters: venue message translation
//!
//! Infrastructure = inbound (venues → gateway),
//! Presentation = outbound (gateway → consumers).

pub mod adapters;
pub mod rest_client;
pub mod ws_client;

pub use adapters::{KucoinAdapter, SUPPORTED_VENUES, VertexAdapter, build_adapter};
pub use rest_client::{RestClient, RestError, RestSnapshotFetcher};
pub use ws_client::{WsClient, WsError, WsRequestSender};
