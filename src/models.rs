// src/models.rs
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque holding identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldingId(String);

impl HoldingId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HoldingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tracked position in the portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: HoldingId,
    pub symbol: String,
    pub shares: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
    /// Price captured when the holding was added or last refreshed.
    pub last_known_price: Option<Decimal>,
    pub last_known_date: Option<NaiveDate>,
}

impl Holding {
    pub fn from_record(id: HoldingId, record: HoldingRecord) -> Self {
        Self {
            id,
            symbol: record.symbol,
            shares: record.shares,
            purchase_price: record.purchase_price,
            last_known_price: record.last_known_price,
            last_known_date: record.last_known_date,
        }
    }

    /// Both shares and purchase price are set.
    pub fn is_quantified(&self) -> bool {
        self.shares.is_some() && self.purchase_price.is_some()
    }

    pub fn to_record(&self) -> HoldingRecord {
        HoldingRecord {
            symbol: self.symbol.clone(),
            shares: self.shares,
            purchase_price: self.purchase_price,
            last_known_price: self.last_known_price,
            last_known_date: self.last_known_date,
        }
    }
}

/// Everything a holding carries except its id.
///
/// Used both for creation and for full replacement: every field is written,
/// so a `None` here clears whatever the store held before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    pub symbol: String,
    #[serde(default)]
    pub shares: Option<Decimal>,
    #[serde(default)]
    pub purchase_price: Option<Decimal>,
    #[serde(default)]
    pub last_known_price: Option<Decimal>,
    #[serde(default)]
    pub last_known_date: Option<NaiveDate>,
}

impl HoldingRecord {
    /// A freshly added holding: symbol plus quote snapshot, not yet quantified.
    pub fn tracked(symbol: impl Into<String>, price: Decimal, date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into(),
            shares: None,
            purchase_price: None,
            last_known_price: Some(price),
            last_known_date: Some(date),
        }
    }
}

/// One daily OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

impl QuoteRecord {
    /// Non-negative prices with `low <= open, close <= high`.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| *p < Decimal::ZERO) {
            return false;
        }
        self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close).min(self.high)
    }
}
