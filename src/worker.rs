// src/worker.rs
//! Background snapshot refresh.
//!
//! A single worker drains holding ids from a channel and refreshes them one
//! after another, so a full pass costs one quote request at a time.

use crate::models::HoldingId;
use crate::portfolio::{PortfolioService, RefreshOutcome};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

pub async fn refresh_worker(service: Arc<PortfolioService>, mut rx: mpsc::Receiver<HoldingId>) {
    while let Some(id) = rx.recv().await {
        match service.refresh(&id).await {
            Ok(RefreshOutcome::Updated(holding)) => {
                debug!("Snapshot for {} refreshed", holding.symbol)
            }
            Ok(other) => debug!("Refresh of {} skipped: {:?}", id, other),
            Err(e) => error!("Error refreshing holding {}: {}", id, e),
        }
    }
    info!("Refresh worker stopped");
}

/// Queue every current holding for a refresh. Returns how many were queued.
pub async fn enqueue_all(service: &PortfolioService, tx: &mpsc::Sender<HoldingId>) -> usize {
    let holdings = match service.store().list_holdings().await {
        Ok(holdings) => holdings,
        Err(e) => {
            error!("Could not list holdings for refresh: {}", e);
            return 0;
        }
    };

    let mut queued = 0;
    for holding in holdings {
        if tx.send(holding.id).await.is_err() {
            error!("Refresh worker is gone, stopping scheduler pass");
            break;
        }
        queued += 1;
    }
    queued
}

/// Spawn the worker plus a timer that queues a full pass every `interval`.
pub fn spawn(service: Arc<PortfolioService>, interval: Duration) -> (JoinHandle<()>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(100);
    let worker = tokio::spawn(refresh_worker(service.clone(), rx));
    let scheduler = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            let queued = enqueue_all(&service, &tx).await;
            info!("Queued {} holdings for snapshot refresh", queued);
        }
    });
    (worker, scheduler)
}
