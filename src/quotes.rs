// src/quotes.rs
//! Daily OHLCV quote providers.

use crate::config::{ProviderKind, QuotesConfig};
use crate::error::{Result, TrackerError};
use crate::models::QuoteRecord;
use crate::validation::max_amount;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

const FINANCIALDATA_BASE_URL: &str = "https://financialdata.net/api/v1";
const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co";

#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Daily records for `symbol`, most recent first. Empty means the symbol
    /// is unknown to the provider.
    async fn quote(&self, symbol: &str) -> Result<Vec<QuoteRecord>>;

    fn name(&self) -> &str;
}

/// Drop records that are not valid OHLCV bars or are priced above
/// [`max_amount`], then order newest first with one record per date.
pub fn normalize_series(symbol: &str, records: Vec<QuoteRecord>) -> Vec<QuoteRecord> {
    let mut series: Vec<QuoteRecord> = records
        .into_iter()
        .filter(|record| {
            let ok = record.is_consistent() && record.high <= max_amount();
            if !ok {
                warn!("Dropping inconsistent {} quote for {}", symbol, record.date);
            }
            ok
        })
        .collect();
    series.sort_by(|a, b| b.date.cmp(&a.date));
    series.dedup_by_key(|record| record.date);
    series
}

fn transport(err: impl std::fmt::Display) -> TrackerError {
    TrackerError::transport("quote provider", err)
}

/// Provider behind `financialdata.net`'s `stock-prices` endpoint.
pub struct FinancialDataProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct StockPrice {
    trading_symbol: Option<String>,
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl StockPrice {
    fn into_record(self) -> Option<QuoteRecord> {
        if !self.volume.is_finite() || self.volume < 0.0 {
            return None;
        }
        Some(QuoteRecord {
            date: NaiveDate::from_str(self.date.get(..10)?).ok()?,
            open: Decimal::from_f64(self.open)?,
            high: Decimal::from_f64(self.high)?,
            low: Decimal::from_f64(self.low)?,
            close: Decimal::from_f64(self.close)?,
            volume: self.volume as u64,
        })
    }
}

impl FinancialDataProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: FINANCIALDATA_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl QuoteProvider for FinancialDataProvider {
    async fn quote(&self, symbol: &str) -> Result<Vec<QuoteRecord>> {
        let url = format!("{}/stock-prices", self.base_url);
        debug!("Requesting {} quotes from {}", symbol, url);

        let response = self
            .client
            .get(&url)
            .query(&[("identifier", symbol), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(transport(format!("HTTP {}", status)));
        }

        let prices: Vec<StockPrice> = response.json().await.map_err(transport)?;
        let records = prices.into_iter().filter_map(StockPrice::into_record).collect();
        let series = normalize_series(symbol, records);
        info!("Fetched {} records for symbol: {}", series.len(), symbol);
        Ok(series)
    }

    fn name(&self) -> &str {
        "financialdata"
    }
}

#[derive(Deserialize)]
struct TimeSeriesData {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

impl TimeSeriesData {
    fn into_record(self, date: &str) -> Option<QuoteRecord> {
        Some(QuoteRecord {
            date: NaiveDate::from_str(date).ok()?,
            open: Decimal::from_str(&self.open).ok()?,
            high: Decimal::from_str(&self.high).ok()?,
            low: Decimal::from_str(&self.low).ok()?,
            close: Decimal::from_str(&self.close).ok()?,
            volume: self.volume.parse().ok()?,
        })
    }
}

#[derive(Deserialize)]
struct AlphaVantageResponse {
    #[serde(rename = "Time Series (Daily)", default)]
    time_series: Option<HashMap<String, TimeSeriesData>>,
}

/// Alpha Vantage `TIME_SERIES_DAILY` provider.
pub struct AlphaVantageProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl QuoteProvider for AlphaVantageProvider {
    async fn quote(&self, symbol: &str) -> Result<Vec<QuoteRecord>> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(transport(format!("HTTP {}", status)));
        }

        let body: AlphaVantageResponse = response.json().await.map_err(transport)?;
        let Some(time_series) = body.time_series else {
            info!("No daily series for {} from alpha vantage", symbol);
            return Ok(Vec::new());
        };

        let records = time_series
            .into_iter()
            .filter_map(|(date, data)| data.into_record(&date))
            .collect();
        Ok(normalize_series(symbol, records))
    }

    fn name(&self) -> &str {
        "alpha_vantage"
    }
}

/// Fixed quotes held in memory, for offline runs and tests.
#[derive(Default)]
pub struct StaticQuoteProvider {
    series: HashMap<String, Vec<QuoteRecord>>,
}

impl StaticQuoteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quotes(mut self, symbol: &str, records: Vec<QuoteRecord>) -> Self {
        let symbol = symbol.to_uppercase();
        let series = normalize_series(&symbol, records);
        self.series.insert(symbol, series);
        self
    }

    /// Load `{ "SYMBOL": [records...] }` from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!("failed to read fixtures {}: {}", path.display(), e))
        })?;
        let fixtures: HashMap<String, Vec<QuoteRecord>> = serde_json::from_str(&content)
            .map_err(|e| TrackerError::Config(format!("invalid fixtures {}: {}", path.display(), e)))?;
        Ok(fixtures
            .into_iter()
            .fold(Self::new(), |provider, (symbol, records)| {
                provider.with_quotes(&symbol, records)
            }))
    }
}

#[async_trait::async_trait]
impl QuoteProvider for StaticQuoteProvider {
    async fn quote(&self, symbol: &str) -> Result<Vec<QuoteRecord>> {
        Ok(self.series.get(symbol).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Build the provider named in the configuration.
pub fn build_provider(config: &QuotesConfig) -> Result<Arc<dyn QuoteProvider>> {
    let provider: Arc<dyn QuoteProvider> = match config.provider {
        ProviderKind::Financialdata => {
            let provider = FinancialDataProvider::new(config.require_api_key()?);
            match &config.base_url {
                Some(url) => Arc::new(provider.with_base_url(url.as_str())),
                None => Arc::new(provider),
            }
        }
        ProviderKind::AlphaVantage => {
            let provider = AlphaVantageProvider::new(config.require_api_key()?);
            match &config.base_url {
                Some(url) => Arc::new(provider.with_base_url(url.as_str())),
                None => Arc::new(provider),
            }
        }
        ProviderKind::Static => match &config.fixtures {
            Some(path) => Arc::new(StaticQuoteProvider::from_file(path)?),
            None => Arc::new(StaticQuoteProvider::new()),
        },
    };
    info!("Using {} quote provider", provider.name());
    Ok(provider)
}
