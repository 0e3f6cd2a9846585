//! Venue adapters: translate venue frames and REST responses to canonical
//! records.

pub mod fields;
pub mod kucoin;
pub mod vertex;

use std::sync::Arc;

use crate::domain::{SymbolRegistry, VenueAdapter};

pub use kucoin::KucoinAdapter;
pub use vertex::VertexAdapter;

/// Venues with an adapter
pub const SUPPORTED_VENUES: &[&str] = &["kucoin", "vertex"];

/// Adapter for a venue id, `None` when the venue is not supported
pub fn build_adapter(venue: &str, registry: Arc<SymbolRegistry>) -> Option<Arc<dyn VenueAdapter>> {
    match venue.to_lowercase().as_str() {
        "kucoin" => Some(Arc::new(KucoinAdapter::new(registry))),
        "vertex" => Some(Arc::new(VertexAdapter::new(registry))),
        _ => None,
    }
}
