mod exchange;
mod price_level;
mod side;
mod symbol;

pub use exchange::{ExchangeId, QualifiedSymbol};
pub use price_level::PriceLevel;
pub use side::{BookSide, Side};
pub use symbol::{InstrumentType, Symbol};
