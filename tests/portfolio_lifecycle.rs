mod support;

use anyhow::Result;
use portfolio_tracker::models::HoldingRecord;
use portfolio_tracker::portfolio::AddRequest;
use portfolio_tracker::store::{HoldingStore, MemoryHoldingStore};
use portfolio_tracker::valuation::{compute_performance, summarize};
use rust_decimal::Decimal;
use support::{date, dec, sample_service};

#[tokio::test]
async fn add_replace_and_price_a_holding() -> Result<()> {
    let store = MemoryHoldingStore::new();
    let snapshot_date = date(2024, 6, 3);

    store
        .create_holding(HoldingRecord::tracked("AAPL", dec("150"), snapshot_date))
        .await?;

    let listed = store.list_holdings().await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].symbol, "AAPL");
    assert_eq!(listed[0].shares, None);
    assert_eq!(listed[0].purchase_price, None);

    let id = listed[0].id.clone();
    let record = HoldingRecord {
        shares: Some(dec("5")),
        purchase_price: Some(dec("120")),
        ..listed[0].to_record()
    };
    store.replace_holding(&id, record).await?;

    let found = store
        .find_holding_by_symbol("AAPL")
        .await?
        .expect("AAPL should be tracked");
    assert_eq!(found.id, id);
    assert_eq!(found.shares, Some(dec("5")));
    assert_eq!(found.purchase_price, Some(dec("120")));

    let performance = compute_performance(&found, Some(dec("150"))).expect("quantified");
    assert_eq!(performance.gain_loss, dec("150"));
    assert_eq!(performance.percent_change, dec("25"));
    Ok(())
}

#[tokio::test]
async fn deleted_holding_stays_gone() -> Result<()> {
    let store = MemoryHoldingStore::new();
    let keep = store
        .create_holding(HoldingRecord::tracked("MSFT", dec("400"), date(2024, 6, 3)))
        .await?;
    let removed = store
        .create_holding(HoldingRecord::tracked("AAPL", dec("150"), date(2024, 6, 3)))
        .await?;

    store.delete_holding(&removed.id).await?;
    store.delete_holding(&removed.id).await?;

    let ids: Vec<_> = store.list_holdings().await?.into_iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![keep.id]);
    Ok(())
}

#[tokio::test]
async fn service_summary_uses_stored_snapshot_not_live_quote() -> Result<()> {
    let service = sample_service();

    // snapshot deliberately differs from the provider's latest close of 150
    let added = service
        .add(AddRequest {
            symbol: "aapl".into(),
            last_known_price: Some(dec("100")),
            last_known_date: Some(date(2024, 5, 1)),
        })
        .await?;
    let id = added.holding().id.clone();

    let mut record = added.holding().to_record();
    record.shares = Some(dec("10"));
    record.purchase_price = Some(dec("80"));
    service.replace(&id, record).await?;

    let summary = service.summary().await?;
    assert_eq!(summary.summary.total_value, dec("1000"));
    assert_eq!(summary.summary.total_investment, dec("800"));
    assert_eq!(summary.summary.total_gain_loss, dec("200"));
    assert_eq!(summary.summary.percentage_change, dec("25"));

    let holdings = service.store().list_holdings().await?;
    assert_eq!(summarize(&holdings).total_value, dec("1000"));
    Ok(())
}

#[tokio::test]
async fn full_replace_clears_omitted_position() -> Result<()> {
    let service = sample_service();
    let added = service
        .add(AddRequest {
            symbol: "MSFT".into(),
            last_known_price: None,
            last_known_date: None,
        })
        .await?;
    let id = added.holding().id.clone();

    let mut quantified = added.holding().to_record();
    quantified.shares = Some(dec("2"));
    quantified.purchase_price = Some(dec("300"));
    service.replace(&id, quantified).await?;

    let bare = HoldingRecord {
        symbol: "MSFT".into(),
        shares: None,
        purchase_price: None,
        last_known_price: Some(dec("415.10")),
        last_known_date: Some(date(2024, 6, 3)),
    };
    let replaced = service.replace(&id, bare).await?;
    assert_eq!(replaced.shares, None);
    assert_eq!(replaced.purchase_price, None);

    let view = service.view().await?;
    assert_eq!(view.summary.summary.total_investment, Decimal::ZERO);
    assert!(view.holdings[0].performance.is_none());
    Ok(())
}
