use feed_core::{ExchangeId, Symbol};
use std::collections::HashMap;
use thiserror::Error;

use super::error::ParseError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate symbol {symbol} on {exchange}")]
    DuplicateSymbol { exchange: ExchangeId, symbol: String },
    #[error("Duplicate venue identifier {venue_id} on {exchange}")]
    DuplicateVenueId {
        exchange: ExchangeId,
        venue_id: String,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    symbol: Symbol,
    venue_id: String,
}

/// Canonical symbol to venue identifier lookup for one venue.
///
/// Built once at startup and shared read-only with the adapter and the
/// snapshot fetcher.
#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    exchange: ExchangeId,
    by_canonical: HashMap<String, Entry>,
    by_venue: HashMap<String, String>,
}

impl SymbolRegistry {
    pub fn new(exchange: impl Into<ExchangeId>) -> Self {
        SymbolRegistry {
            exchange: exchange.into(),
            by_canonical: HashMap::new(),
            by_venue: HashMap::new(),
        }
    }

    pub fn with_symbols<I, S>(exchange: impl Into<ExchangeId>, entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (Symbol, S)>,
        S: Into<String>,
    {
        let mut registry = SymbolRegistry::new(exchange);
        for (symbol, venue_id) in entries {
            registry.insert(symbol, venue_id)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, symbol: Symbol, venue_id: impl Into<String>) -> Result<(), RegistryError> {
        let canonical = symbol.normalized();
        let venue_id = venue_id.into();

        if self.by_canonical.contains_key(&canonical) {
            return Err(RegistryError::DuplicateSymbol {
                exchange: self.exchange.clone(),
                symbol: canonical,
            });
        }
        if self.by_venue.contains_key(&venue_id) {
            return Err(RegistryError::DuplicateVenueId {
                exchange: self.exchange.clone(),
                venue_id,
            });
        }

        self.by_venue.insert(venue_id.clone(), canonical.clone());
        self.by_canonical.insert(canonical, Entry { symbol, venue_id });
        Ok(())
    }

    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    /// Canonical name for a venue identifier
    pub fn canonical(&self, venue_id: &str) -> Option<&str> {
        self.by_venue.get(venue_id).map(String::as_str)
    }

    /// Venue identifier for a canonical name
    pub fn venue_id(&self, canonical: &str) -> Option<&str> {
        self.by_canonical.get(canonical).map(|e| e.venue_id.as_str())
    }

    pub fn symbol(&self, canonical: &str) -> Option<&Symbol> {
        self.by_canonical.get(canonical).map(|e| &e.symbol)
    }

    /// Like [`canonical`](Self::canonical) but fails with a parse error
    pub fn resolve(&self, venue_id: &str) -> Result<&str, ParseError> {
        self.canonical(venue_id)
            .ok_or_else(|| ParseError::UnknownSymbol(venue_id.to_string()))
    }

    /// Canonical names, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.by_canonical.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Venue identifiers, in canonical-name order
    pub fn venue_ids(&self) -> Vec<String> {
        self.symbols()
            .iter()
            .filter_map(|s| self.venue_id(s).map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_canonical.is_empty()
    }
}
