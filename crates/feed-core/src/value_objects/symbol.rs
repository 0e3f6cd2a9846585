use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument kind of a canonical symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    #[default]
    Spot,
    Perpetual,
    Future,
}

/// Canonical, venue-independent symbol.
///
/// The normalized name is `BASE-QUOTE` for spot and carries a suffix for
/// derivatives (`BTC-USDT-PERP`, `BTC-USDT-FUT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    base: String,
    quote: String,
    instrument_type: InstrumentType,
}

impl Symbol {
    pub fn new(
        base: impl Into<String>,
        quote: impl Into<String>,
        instrument_type: InstrumentType,
    ) -> Self {
        Symbol {
            base: base.into().to_uppercase(),
            quote: quote.into().to_uppercase(),
            instrument_type,
        }
    }

    pub fn spot(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Symbol::new(base, quote, InstrumentType::Spot)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    pub fn instrument_type(&self) -> InstrumentType {
        self.instrument_type
    }

    /// Normalized canonical name used in every emitted event
    pub fn normalized(&self) -> String {
        match self.instrument_type {
            InstrumentType::Spot => format!("{}-{}", self.base, self.quote),
            InstrumentType::Perpetual => format!("{}-{}-PERP", self.base, self.quote),
            InstrumentType::Future => format!("{}-{}-FUT", self.base, self.quote),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_normalized() {
        let sym = Symbol::spot("btc", "usdt");
        assert_eq!(sym.base(), "BTC");
        assert_eq!(sym.quote(), "USDT");
        assert_eq!(sym.normalized(), "BTC-USDT");
    }

    #[test]
    fn test_derivative_suffix() {
        let perp = Symbol::new("ETH", "USDC", InstrumentType::Perpetual);
        assert_eq!(perp.to_string(), "ETH-USDC-PERP");
        let fut = Symbol::new("ETH", "USDC", InstrumentType::Future);
        assert_eq!(fut.to_string(), "ETH-USDC-FUT");
    }

    #[test]
    fn test_instrument_type_default_is_spot() {
        let json = r#""perpetual""#;
        let kind: InstrumentType = serde_json::from_str(json).unwrap();
        assert_eq!(kind, InstrumentType::Perpetual);
        assert_eq!(InstrumentType::default(), InstrumentType::Spot);
    }
}
