use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a venue
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn new(id: impl Into<String>) -> Self {
        ExchangeId(id.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExchangeId {
    fn from(s: &str) -> Self {
        ExchangeId::new(s)
    }
}

impl From<String> for ExchangeId {
    fn from(s: String) -> Self {
        ExchangeId::new(s)
    }
}

impl From<ExchangeId> for String {
    fn from(id: ExchangeId) -> Self {
        id.0
    }
}

/// Well-known venue identifiers
impl ExchangeId {
    pub fn kucoin() -> Self {
        ExchangeId::new("kucoin")
    }

    pub fn vertex() -> Self {
        ExchangeId::new("vertex")
    }
}

/// A canonical symbol qualified with its venue
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedSymbol {
    pub exchange: ExchangeId,
    pub symbol: String,
}

impl QualifiedSymbol {
    pub fn new(exchange: impl Into<ExchangeId>, symbol: impl Into<String>) -> Self {
        QualifiedSymbol {
            exchange: exchange.into(),
            symbol: symbol.into().to_uppercase(),
        }
    }
}

impl fmt::Display for QualifiedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}
