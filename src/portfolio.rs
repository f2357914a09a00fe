// src/portfolio.rs
//! Portfolio commands and views: the add / update / remove protocol against
//! the holding store, and the priced views built on top of it.

use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::generation::{GenerationGuard, KeyedLocks};
use crate::models::{Holding, HoldingId, HoldingRecord, QuoteRecord};
use crate::quotes::QuoteProvider;
use crate::store::HoldingStore;
use crate::validation::{normalize_symbol, validate_record, PositionForm};
use crate::valuation::{compute_performance, summarize, Performance, PortfolioSummary, Trend};
use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PortfolioSettings {
    pub history_limit: usize,
    pub allow_duplicate_symbols: bool,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            history_limit: 10,
            allow_duplicate_symbols: false,
        }
    }
}

impl From<&Config> for PortfolioSettings {
    fn from(config: &Config) -> Self {
        Self {
            history_limit: config.quotes.history_limit,
            allow_duplicate_symbols: config.portfolio.allow_duplicate_symbols,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub symbol: String,
    pub found: bool,
    pub latest: Option<QuoteRecord>,
}

/// A holding plus its performance, rounded for display.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingView {
    #[serde(flatten)]
    pub holding: Holding,
    pub performance: Option<Performance>,
    pub trend: Option<Trend>,
}

impl HoldingView {
    fn priced(holding: Holding, current_price: Option<Decimal>) -> Self {
        let performance = compute_performance(&holding, current_price);
        Self {
            trend: performance.as_ref().map(Performance::trend),
            performance: performance.map(|p| p.rounded()),
            holding,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryView {
    #[serde(flatten)]
    pub summary: PortfolioSummary,
    pub trend: Trend,
}

impl From<PortfolioSummary> for SummaryView {
    fn from(summary: PortfolioSummary) -> Self {
        Self {
            trend: summary.trend(),
            summary: summary.rounded(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioView {
    pub holdings: Vec<HoldingView>,
    pub summary: SummaryView,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockDetail {
    pub symbol: String,
    pub found: bool,
    pub latest: Option<QuoteRecord>,
    pub history: Vec<QuoteRecord>,
    /// Present when the symbol is tracked; priced at the latest close.
    pub holding: Option<HoldingView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddRequest {
    pub symbol: String,
    #[serde(default)]
    pub last_known_price: Option<Decimal>,
    #[serde(default)]
    pub last_known_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    Created(Holding),
    AlreadyTracked(Holding),
}

impl AddOutcome {
    pub fn holding(&self) -> &Holding {
        match self {
            AddOutcome::Created(h) | AddOutcome::AlreadyTracked(h) => h,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "holding", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Updated(Holding),
    /// The quote was not newer than the stored snapshot.
    Unchanged(Holding),
    /// A later refresh or edit for the same holding started first.
    Superseded,
    NoQuote,
}

pub struct PortfolioService {
    store: Arc<dyn HoldingStore>,
    quotes: Arc<dyn QuoteProvider>,
    settings: PortfolioSettings,
    refreshes: GenerationGuard,
    /// Serialises every store write for one holding id.
    writes: KeyedLocks,
    /// Serialises duplicate check and create for one symbol.
    adds: KeyedLocks,
}

impl PortfolioService {
    pub fn new(
        store: Arc<dyn HoldingStore>,
        quotes: Arc<dyn QuoteProvider>,
        settings: PortfolioSettings,
    ) -> Self {
        Self {
            store,
            quotes,
            settings,
            refreshes: GenerationGuard::new(),
            writes: KeyedLocks::new(),
            adds: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn HoldingStore> {
        &self.store
    }

    pub async fn search(&self, symbol: &str) -> Result<SearchResult> {
        let symbol = normalize_symbol(symbol)?;
        let quotes = self.quotes.quote(&symbol).await?;
        Ok(SearchResult {
            found: !quotes.is_empty(),
            latest: quotes.into_iter().next(),
            symbol,
        })
    }

    /// Latest quote, recent history and the tracked holding for `symbol`.
    pub async fn detail(&self, symbol: &str) -> Result<StockDetail> {
        let symbol = normalize_symbol(symbol)?;
        let quotes = self.quotes.quote(&symbol).await?;
        let holding = self.store.find_holding_by_symbol(&symbol).await?;

        let latest = quotes.first().cloned();
        let current_price = latest
            .as_ref()
            .map(|q| q.close)
            .or_else(|| holding.as_ref().and_then(|h| h.last_known_price));

        Ok(StockDetail {
            found: latest.is_some(),
            history: quotes.into_iter().take(self.settings.history_limit).collect(),
            holding: holding.map(|h| HoldingView::priced(h, current_price)),
            latest,
            symbol,
        })
    }

    pub async fn view(&self) -> Result<PortfolioView> {
        let holdings = self.store.list_holdings().await?;
        let summary = summarize(&holdings).into();
        let holdings = holdings
            .into_iter()
            .map(|h| {
                let price = h.last_known_price;
                HoldingView::priced(h, price)
            })
            .collect();
        Ok(PortfolioView { holdings, summary })
    }

    /// Aggregate totals, priced at each holding's stored snapshot.
    pub async fn summary(&self) -> Result<SummaryView> {
        let holdings = self.store.list_holdings().await?;
        Ok(summarize(&holdings).into())
    }

    pub async fn holding(&self, id: &HoldingId) -> Result<HoldingView> {
        let holding = self.require(id).await?;
        let price = holding.last_known_price;
        Ok(HoldingView::priced(holding, price))
    }

    pub async fn find_by_symbol(&self, symbol: &str) -> Result<Option<Holding>> {
        let symbol = normalize_symbol(symbol)?;
        self.store.find_holding_by_symbol(&symbol).await
    }

    /// Start tracking a symbol.
    ///
    /// Without a snapshot in the request the latest quote is fetched first.
    pub async fn add(&self, request: AddRequest) -> Result<AddOutcome> {
        let symbol = normalize_symbol(&request.symbol)?;
        let _adding = self.adds.lock(&symbol).await;

        if !self.settings.allow_duplicate_symbols {
            if let Some(existing) = self.store.find_holding_by_symbol(&symbol).await? {
                info!("{} is already tracked as {}", symbol, existing.id);
                return Ok(AddOutcome::AlreadyTracked(existing));
            }
        }

        let record = match (request.last_known_price, request.last_known_date) {
            (Some(price), Some(date)) => HoldingRecord::tracked(symbol.as_str(), price, date),
            (None, None) => {
                let latest = self
                    .quotes
                    .quote(&symbol)
                    .await?
                    .into_iter()
                    .next()
                    .ok_or_else(|| TrackerError::NotFound(format!("quotes for {}", symbol)))?;
                HoldingRecord::tracked(symbol.as_str(), latest.close, latest.date)
            }
            _ => {
                return Err(TrackerError::validation(
                    "last known price and date must be supplied together",
                ))
            }
        };
        let record = validate_record(record)?;

        let holding = self.store.create_holding(record).await?;
        info!("Added {} to portfolio as {}", holding.symbol, holding.id);
        Ok(AddOutcome::Created(holding))
    }

    /// Replace every field of a holding. Absent optional fields are cleared.
    pub async fn replace(&self, id: &HoldingId, record: HoldingRecord) -> Result<Holding> {
        let record = validate_record(record)?;
        let _writing = self.writes.lock(id.as_str()).await;
        self.replace_locked(id, record).await
    }

    async fn replace_locked(&self, id: &HoldingId, record: HoldingRecord) -> Result<Holding> {
        let existing = self.require(id).await?;
        if existing.symbol != record.symbol {
            return Err(TrackerError::validation(format!(
                "symbol of holding {} is {} and cannot change",
                id, existing.symbol
            )));
        }

        self.refreshes.retire(id.as_str());
        let holding = self.store.replace_holding(id, record).await?;
        info!("Replaced holding {} ({})", holding.id, holding.symbol);
        Ok(holding)
    }

    /// Set shares and purchase price from the edit form, keeping the rest of
    /// the record. Still a full replace on the store.
    pub async fn edit_position(&self, id: &HoldingId, form: &PositionForm) -> Result<Holding> {
        let position = form.validate()?;
        let _writing = self.writes.lock(id.as_str()).await;
        let existing = self.require(id).await?;
        let record = validate_record(HoldingRecord {
            shares: position.shares,
            purchase_price: position.purchase_price,
            ..existing.to_record()
        })?;
        self.replace_locked(id, record).await
    }

    /// Re-capture the snapshot price from the latest quote.
    ///
    /// Holding and quote are fetched in sequence. The result is discarded if
    /// another refresh, edit or removal of the same holding began while the
    /// quote was in flight, or if the quote is older than the snapshot. The
    /// check, re-read and write run under the holding's write lock.
    pub async fn refresh(&self, id: &HoldingId) -> Result<RefreshOutcome> {
        let holding = self.require(id).await?;
        let ticket = self.refreshes.begin(id.as_str());
        let quotes = self.quotes.quote(&holding.symbol).await?;
        let Some(latest) = quotes.into_iter().next() else {
            return Ok(RefreshOutcome::NoQuote);
        };

        let _writing = self.writes.lock(id.as_str()).await;
        if !self.refreshes.is_current(&ticket) {
            debug!("Discarding superseded refresh of {}", id);
            return Ok(RefreshOutcome::Superseded);
        }

        let Some(current) = self.store.get_holding(id).await? else {
            self.refreshes.forget(id.as_str());
            return Err(TrackerError::NotFound(format!("holding {}", id)));
        };
        if matches!(current.last_known_date, Some(date) if latest.date < date) {
            debug!("Quote for {} on {} is older than snapshot", current.symbol, latest.date);
            return Ok(RefreshOutcome::Unchanged(current));
        }

        let record = HoldingRecord {
            last_known_price: Some(latest.close),
            last_known_date: Some(latest.date),
            ..current.to_record()
        };
        let updated = self.store.replace_holding(id, record).await?;
        info!(
            "Refreshed {} snapshot to {} on {}",
            updated.symbol, latest.close, latest.date
        );
        Ok(RefreshOutcome::Updated(updated))
    }

    /// Stop tracking a holding. Removing an unknown id is a no-op.
    pub async fn remove(&self, id: &HoldingId) -> Result<()> {
        let _writing = self.writes.lock(id.as_str()).await;
        self.refreshes.retire(id.as_str());
        self.store.delete_holding(id).await?;
        self.refreshes.forget(id.as_str());
        info!("Removed holding {}", id);
        Ok(())
    }

    async fn require(&self, id: &HoldingId) -> Result<Holding> {
        self.store
            .get_holding(id)
            .await?
            .ok_or_else(|| TrackerError::NotFound(format!("holding {}", id)))
    }
}
