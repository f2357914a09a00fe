#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use portfolio_tracker::models::QuoteRecord;
use portfolio_tracker::portfolio::{PortfolioService, PortfolioSettings};
use portfolio_tracker::quotes::StaticQuoteProvider;
use portfolio_tracker::store::MemoryHoldingStore;
use rust_decimal::Decimal;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

pub fn quote(on: NaiveDate, close: &str) -> QuoteRecord {
    let close = dec(close);
    QuoteRecord {
        date: on,
        open: close,
        high: close + Decimal::ONE,
        low: close - Decimal::ONE,
        close,
        volume: 1_000_000,
    }
}

/// AAPL closes at 150 on 2024-06-03 (and 148 the day before).
pub fn sample_provider() -> StaticQuoteProvider {
    StaticQuoteProvider::new()
        .with_quotes(
            "AAPL",
            vec![quote(date(2024, 6, 3), "150"), quote(date(2024, 5, 31), "148")],
        )
        .with_quotes("MSFT", vec![quote(date(2024, 6, 3), "415.10")])
}

pub fn sample_service() -> Arc<PortfolioService> {
    Arc::new(PortfolioService::new(
        Arc::new(MemoryHoldingStore::new()),
        Arc::new(sample_provider()),
        PortfolioSettings::default(),
    ))
}
