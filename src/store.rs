// src/store.rs
use crate::error::{Result, TrackerError};
use crate::models::{Holding, HoldingId, HoldingRecord};
use tokio::sync::Mutex;

/// Canonical record store for holdings, keyed by id.
///
/// Implementations serialise their own writes; callers hold no locks across
/// calls.
#[async_trait::async_trait]
pub trait HoldingStore: Send + Sync {
    async fn list_holdings(&self) -> Result<Vec<Holding>>;

    async fn get_holding(&self, id: &HoldingId) -> Result<Option<Holding>>;

    /// First holding tracking `symbol`, if any.
    async fn find_holding_by_symbol(&self, symbol: &str) -> Result<Option<Holding>>;

    /// Store a new holding under a freshly assigned id.
    async fn create_holding(&self, record: HoldingRecord) -> Result<Holding>;

    /// Overwrite every field of an existing holding.
    ///
    /// Fails with `NotFound` when `id` is unknown.
    async fn replace_holding(&self, id: &HoldingId, record: HoldingRecord) -> Result<Holding>;

    /// Remove a holding. Deleting an unknown id succeeds.
    async fn delete_holding(&self, id: &HoldingId) -> Result<()>;
}

/// In-memory store. Keeps insertion order so listings are stable.
pub struct MemoryHoldingStore {
    holdings: Mutex<Vec<Holding>>,
}

impl MemoryHoldingStore {
    pub fn new() -> Self {
        Self {
            holdings: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MemoryHoldingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HoldingStore for MemoryHoldingStore {
    async fn list_holdings(&self) -> Result<Vec<Holding>> {
        Ok(self.holdings.lock().await.clone())
    }

    async fn get_holding(&self, id: &HoldingId) -> Result<Option<Holding>> {
        let holdings = self.holdings.lock().await;
        Ok(holdings.iter().find(|h| &h.id == id).cloned())
    }

    async fn find_holding_by_symbol(&self, symbol: &str) -> Result<Option<Holding>> {
        let holdings = self.holdings.lock().await;
        Ok(holdings.iter().find(|h| h.symbol == symbol).cloned())
    }

    async fn create_holding(&self, record: HoldingRecord) -> Result<Holding> {
        let holding = Holding::from_record(HoldingId::generate(), record);
        self.holdings.lock().await.push(holding.clone());
        Ok(holding)
    }

    async fn replace_holding(&self, id: &HoldingId, record: HoldingRecord) -> Result<Holding> {
        let mut holdings = self.holdings.lock().await;
        let slot = holdings
            .iter_mut()
            .find(|h| &h.id == id)
            .ok_or_else(|| TrackerError::NotFound(format!("holding {}", id)))?;
        *slot = Holding::from_record(id.clone(), record);
        Ok(slot.clone())
    }

    async fn delete_holding(&self, id: &HoldingId) -> Result<()> {
        self.holdings.lock().await.retain(|h| &h.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn aapl() -> HoldingRecord {
        HoldingRecord::tracked(
            "AAPL",
            Decimal::from(150),
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        )
    }

    #[tokio::test]
    async fn create_assigns_distinct_ids() {
        let store = MemoryHoldingStore::new();
        let a = store.create_holding(aapl()).await.unwrap();
        let b = store.create_holding(aapl()).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.list_holdings().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn replace_overwrites_every_field() {
        let store = MemoryHoldingStore::new();
        let mut record = aapl();
        record.shares = Some(Decimal::from(5));
        record.purchase_price = Some(Decimal::from(120));
        let created = store.create_holding(record).await.unwrap();

        let replaced = store.replace_holding(&created.id, aapl()).await.unwrap();
        assert_eq!(replaced.shares, None);
        assert_eq!(replaced.purchase_price, None);
        assert_eq!(store.get_holding(&created.id).await.unwrap(), Some(replaced));
    }

    #[tokio::test]
    async fn replace_unknown_id_is_not_found() {
        let store = MemoryHoldingStore::new();
        let err = store
            .replace_holding(&HoldingId::from_string("missing"), aapl())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryHoldingStore::new();
        let created = store.create_holding(aapl()).await.unwrap();
        store.delete_holding(&created.id).await.unwrap();
        store.delete_holding(&created.id).await.unwrap();
        assert!(store.list_holdings().await.unwrap().is_empty());
        assert_eq!(store.find_holding_by_symbol("AAPL").await.unwrap(), None);
    }
}
