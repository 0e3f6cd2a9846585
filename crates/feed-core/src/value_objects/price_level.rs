use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single aggregated price level.
///
/// Inside a delta a zero `size` marks removal of the level; a resting book
/// never contains one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        PriceLevel { price, size }
    }

    pub fn is_removal(&self) -> bool {
        self.size.is_zero()
    }
}

impl From<(Decimal, Decimal)> for PriceLevel {
    fn from((price, size): (Decimal, Decimal)) -> Self {
        PriceLevel { price, size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_removal_marker() {
        assert!(PriceLevel::new(dec!(100), dec!(0)).is_removal());
        assert!(!PriceLevel::new(dec!(100), dec!(0.0001)).is_removal());
    }

    #[test]
    fn test_decimal_serializes_as_string() {
        let level = PriceLevel::new(dec!(100.50), dec!(2));
        let json = serde_json::to_value(level).unwrap();
        assert_eq!(json["price"], "100.50");
        assert_eq!(json["size"], "2");
    }
}
