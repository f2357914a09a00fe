use std::io::Write;

use anyhow::Result;
use portfolio_tracker::config::{Config, ProviderKind, StoreBackend};
use portfolio_tracker::quotes::{build_provider, QuoteProvider};
use portfolio_tracker::TrackerError;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn missing_file_falls_back_to_defaults() -> Result<()> {
    let dir = tempdir()?;
    let config = Config::load_or_default(&dir.path().join("absent.toml"))?;
    assert_eq!(config.quotes.provider, ProviderKind::Financialdata);
    assert_eq!(config.store.backend, StoreBackend::Memory);
    Ok(())
}

#[test]
fn unreadable_toml_is_a_config_error() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "[server\nport = ")?;
    assert!(matches!(
        Config::load(file.path()),
        Err(TrackerError::Config(_))
    ));
    Ok(())
}

#[tokio::test]
async fn static_provider_reads_fixture_file() -> Result<()> {
    let dir = tempdir()?;
    let fixtures = dir.path().join("quotes.json");
    std::fs::write(
        &fixtures,
        r#"{
            "tsla": [
                {"date": "2024-04-01", "open": "175.0", "high": "176.5", "low": "170.1", "close": "175.2", "volume": 81562100},
                {"date": "2024-04-02", "open": "164.8", "high": "167.7", "low": "163.4", "close": "166.6", "volume": 116650600}
            ]
        }"#,
    )?;

    let config_path = dir.path().join("portfolio_tracker.toml");
    std::fs::write(
        &config_path,
        format!(
            "log_level = \"debug\"\n\n[quotes]\nprovider = \"static\"\nfixtures = {:?}\nhistory_limit = 5\n",
            fixtures.display().to_string()
        ),
    )?;

    let config = Config::load(&config_path)?;
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.quotes.history_limit, 5);

    let provider = build_provider(&config.quotes)?;
    assert_eq!(provider.name(), "static");
    let quotes = provider.quote("TSLA").await?;
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].date.to_string(), "2024-04-02");
    Ok(())
}
