// src/db.rs
//! ScyllaDB-backed holding store.
//!
//! Decimals and dates are stored as TEXT so values round-trip exactly.

use crate::config::StoreConfig;
use crate::error::{Result, TrackerError};
use crate::models::{Holding, HoldingId, HoldingRecord};
use crate::store::HoldingStore;
use chrono::NaiveDate;
use log::{error, info, warn};
use rust_decimal::Decimal;
use scylla::{frame::response::result::CqlValue, query::Query, Session, SessionBuilder};
use std::str::FromStr;

const COLUMNS: &str = "id, symbol, shares, purchase_price, last_known_price, last_known_date";

pub struct ScyllaHoldingStore {
    session: Session,
    table: String,
}

fn store_err(err: impl std::fmt::Display) -> TrackerError {
    TrackerError::transport("holding store", err)
}

fn valid_keyspace(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ScyllaHoldingStore {
    /// Connect to the configured node and make sure the schema exists.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        if !valid_keyspace(&config.keyspace) {
            return Err(TrackerError::Config(format!(
                "invalid keyspace name '{}'",
                config.keyspace
            )));
        }

        let session = SessionBuilder::new()
            .known_node(&config.known_node)
            .build()
            .await
            .map_err(store_err)?;

        let keyspace = &config.keyspace;
        let table = format!("{}.holdings", keyspace);
        session
            .query(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    keyspace
                ),
                &[],
            )
            .await
            .map_err(store_err)?;
        session
            .query(
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, symbol TEXT, shares TEXT, purchase_price TEXT, last_known_price TEXT, last_known_date TEXT)",
                    table
                ),
                &[],
            )
            .await
            .map_err(store_err)?;
        session
            .query(format!("CREATE INDEX IF NOT EXISTS ON {} (symbol)", table), &[])
            .await
            .map_err(store_err)?;

        info!("Connected to ScyllaDB at {}.", config.known_node);
        Ok(Self { session, table })
    }

    async fn select(&self, filter: &str, value: &str) -> Result<Vec<Holding>> {
        let query = Query::new(format!("SELECT {} FROM {} WHERE {} = ?", COLUMNS, self.table, filter));
        let result = self.session.query(query, (value,)).await.map_err(store_err)?;
        Ok(result
            .rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| holding_from_columns(&row.columns))
            .collect())
    }

    async fn write(&self, id: &HoldingId, record: &HoldingRecord) -> Result<()> {
        let query = Query::new(format!("INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?)", self.table, COLUMNS));
        self.session
            .query(
                query,
                (
                    id.as_str(),
                    record.symbol.as_str(),
                    record.shares.map(|d| d.to_string()),
                    record.purchase_price.map(|d| d.to_string()),
                    record.last_known_price.map(|d| d.to_string()),
                    record.last_known_date.map(|d| d.to_string()),
                ),
            )
            .await
            .map_err(store_err)?;
        Ok(())
    }
}

/// First column of a lightweight-transaction result is `[applied]`.
fn was_applied(columns: &[Option<CqlValue>]) -> bool {
    matches!(columns.first(), Some(Some(CqlValue::Boolean(true))))
}

fn text(column: &Option<CqlValue>) -> Option<&str> {
    column.as_ref().and_then(|v| v.as_text()).map(|s| s.as_str())
}

fn holding_from_columns(columns: &[Option<CqlValue>]) -> Option<Holding> {
    if columns.len() < 6 {
        error!("Holding row has {} columns, expected 6", columns.len());
        return None;
    }
    let id = text(&columns[0])?;
    let symbol = text(&columns[1])?;

    let decimal = |idx: usize| -> Option<Decimal> {
        let raw = text(&columns[idx])?;
        match Decimal::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable decimal '{}' on holding {}: {}", raw, id, e);
                None
            }
        }
    };
    let last_known_date = text(&columns[5]).and_then(|raw| NaiveDate::from_str(raw).ok());

    Some(Holding {
        id: HoldingId::from_string(id),
        symbol: symbol.to_string(),
        shares: decimal(2),
        purchase_price: decimal(3),
        last_known_price: decimal(4),
        last_known_date,
    })
}

#[async_trait::async_trait]
impl HoldingStore for ScyllaHoldingStore {
    async fn list_holdings(&self) -> Result<Vec<Holding>> {
        let query = Query::new(format!("SELECT {} FROM {}", COLUMNS, self.table));
        let result = self.session.query(query, &[]).await.map_err(store_err)?;
        let holdings: Vec<Holding> = result
            .rows
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| holding_from_columns(&row.columns))
            .collect();
        info!("Fetched {} holdings", holdings.len());
        Ok(holdings)
    }

    async fn get_holding(&self, id: &HoldingId) -> Result<Option<Holding>> {
        Ok(self.select("id", id.as_str()).await?.into_iter().next())
    }

    async fn find_holding_by_symbol(&self, symbol: &str) -> Result<Option<Holding>> {
        Ok(self.select("symbol", symbol).await?.into_iter().next())
    }

    async fn create_holding(&self, record: HoldingRecord) -> Result<Holding> {
        let id = HoldingId::generate();
        self.write(&id, &record).await?;
        Ok(Holding::from_record(id, record))
    }

    async fn replace_holding(&self, id: &HoldingId, record: HoldingRecord) -> Result<Holding> {
        // conditional update, so a concurrent delete is never undone
        let query = Query::new(format!(
            "UPDATE {} SET symbol = ?, shares = ?, purchase_price = ?, last_known_price = ?, last_known_date = ? WHERE id = ? IF EXISTS",
            self.table
        ));
        let result = self
            .session
            .query(
                query,
                (
                    record.symbol.as_str(),
                    record.shares.map(|d| d.to_string()),
                    record.purchase_price.map(|d| d.to_string()),
                    record.last_known_price.map(|d| d.to_string()),
                    record.last_known_date.map(|d| d.to_string()),
                    id.as_str(),
                ),
            )
            .await
            .map_err(store_err)?;

        let applied = result
            .rows
            .unwrap_or_default()
            .first()
            .is_some_and(|row| was_applied(&row.columns));
        if !applied {
            return Err(TrackerError::NotFound(format!("holding {}", id)));
        }
        Ok(Holding::from_record(id.clone(), record))
    }

    async fn delete_holding(&self, id: &HoldingId) -> Result<()> {
        let query = Query::new(format!("DELETE FROM {} WHERE id = ?", self.table));
        self.session
            .query(query, (id.as_str(),))
            .await
            .map_err(store_err)?;
        Ok(())
    }
}
