use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickError {
    #[error("symbol is empty")]
    EmptySymbol,
    #[error("price must be > 0 (got {0})")]
    NonPositivePrice(Decimal),
    #[error("price {0} has more than 8 decimal places")]
    TooManyDecimals(Decimal),
    #[error("price {0} is too large (must be < 10^12)")]
    PriceTooLarge(Decimal),
}

/// Digits kept after the decimal point; matches the `NUMERIC(20, 8)` price column.
pub const PRICE_SCALE: u32 = 8;

/// Exclusive upper bound on prices, the integer part of `NUMERIC(20, 8)`.
pub const PRICE_LIMIT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Canonical symbol form shared by the decoder, the stores and the query layer.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// One observed price update. Construction validates the symbol and price, so every `Tick`
/// in the system satisfies `0 < price < 10^12` with at most [`PRICE_SCALE`] decimal places,
/// and carries a non-empty upper-case symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tick {
    symbol: String,
    price: Decimal,
    event_time: DateTime<Utc>,
}

impl Tick {
    pub fn new(symbol: &str, price: Decimal, event_time: DateTime<Utc>) -> Result<Self, TickError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(TickError::EmptySymbol);
        }
        if price <= Decimal::ZERO {
            return Err(TickError::NonPositivePrice(price));
        }
        if price.normalize().scale() > PRICE_SCALE {
            return Err(TickError::TooManyDecimals(price));
        }
        if price >= PRICE_LIMIT {
            return Err(TickError::PriceTooLarge(price));
        }
        Ok(Self {
            symbol,
            price,
            event_time,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }
}

/// A tick as persisted by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredTick {
    pub id: i64,
    #[serde(flatten)]
    pub tick: Tick,
    /// Assigned at write time; diagnostics and tie-breaks only.
    pub ingestion_time: DateTime<Utc>,
}

impl StoredTick {
    pub fn symbol(&self) -> &str {
        self.tick.symbol()
    }

    pub fn price(&self) -> Decimal {
        self.tick.price()
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.tick.event_time()
    }
}
