// src/validation.rs
//! Input checks applied before anything reaches the holding store.

use crate::error::{Result, TrackerError};
use crate::models::HoldingRecord;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

const MAX_SYMBOL_LEN: usize = 12;

/// Upper bound on shares and per-share prices, keeps products well inside
/// `Decimal` range.
pub fn max_amount() -> Decimal {
    Decimal::from(1_000_000_000_000u64)
}

/// Trim and upper-case a ticker, rejecting anything that isn't one.
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(TrackerError::validation("please enter a stock symbol"));
    }
    if symbol.len() > MAX_SYMBOL_LEN
        || !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(TrackerError::validation(format!(
            "'{}' is not a valid stock symbol",
            raw.trim()
        )));
    }
    Ok(symbol)
}

/// Parse an optional amount typed by the user.
///
/// Blank or missing input means "not set". JSON numbers and numeric strings
/// are accepted; anything else, negatives and out-of-range values are
/// rejected.
pub fn parse_amount(field: &str, input: Option<&Value>) -> Result<Option<Decimal>> {
    let text = match input {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(TrackerError::validation(format!("{} must be a number", field))),
    };

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| TrackerError::validation(format!("{} must be a number", field)))?;
    check_amount(field, amount)?;
    Ok(Some(amount))
}

fn check_amount(field: &str, amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(TrackerError::validation(format!("{} cannot be negative", field)));
    }
    if amount > max_amount() {
        return Err(TrackerError::validation(format!("{} is too large", field)));
    }
    Ok(())
}

/// Shares and purchase price as entered in the edit form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionForm {
    #[serde(default)]
    pub shares: Option<Value>,
    #[serde(default)]
    pub purchase_price: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub shares: Option<Decimal>,
    pub purchase_price: Option<Decimal>,
}

impl PositionForm {
    pub fn validate(&self) -> Result<Position> {
        let shares = parse_amount("shares", self.shares.as_ref())?;
        let purchase_price = parse_amount("purchase price", self.purchase_price.as_ref())?;
        check_pairing(shares, purchase_price)?;
        Ok(Position {
            shares,
            purchase_price,
        })
    }
}

fn check_pairing(shares: Option<Decimal>, purchase_price: Option<Decimal>) -> Result<()> {
    if shares.is_some() != purchase_price.is_some() {
        return Err(TrackerError::validation(
            "shares and purchase price must be entered together",
        ));
    }
    Ok(())
}

/// Validate a full replacement record and normalise its symbol.
pub fn validate_record(mut record: HoldingRecord) -> Result<HoldingRecord> {
    record.symbol = normalize_symbol(&record.symbol)?;
    for (field, value) in [
        ("shares", record.shares),
        ("purchase price", record.purchase_price),
        ("last known price", record.last_known_price),
    ] {
        if let Some(amount) = value {
            check_amount(field, amount)?;
        }
    }
    check_pairing(record.shares, record.purchase_price)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(shares: Value, price: Value) -> PositionForm {
        PositionForm {
            shares: Some(shares),
            purchase_price: Some(price),
        }
    }

    #[test]
    fn symbols_are_trimmed_and_uppercased() {
        assert_eq!(normalize_symbol("  aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
    }

    #[test]
    fn blank_or_odd_symbols_are_rejected() {
        assert!(matches!(normalize_symbol("   "), Err(TrackerError::Validation(_))));
        assert!(matches!(normalize_symbol("AA PL"), Err(TrackerError::Validation(_))));
        assert!(matches!(
            normalize_symbol("ABCDEFGHIJKLMN"),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn blank_fields_clear_the_position() {
        let position = form(json!(""), Value::Null).validate().unwrap();
        assert_eq!(position.shares, None);
        assert_eq!(position.purchase_price, None);
        assert_eq!(PositionForm::default().validate().unwrap().shares, None);
    }

    #[test]
    fn numbers_and_numeric_strings_are_accepted() {
        let position = form(json!(5), json!("120.50")).validate().unwrap();
        assert_eq!(position.shares, Some(Decimal::from(5)));
        assert_eq!(position.purchase_price, Some("120.5".parse().unwrap()));
    }

    #[test]
    fn non_numeric_input_is_rejected() {
        let err = form(json!("ten"), json!("100")).validate().unwrap_err();
        assert_eq!(err.to_string(), "shares must be a number");
        assert!(form(json!(true), json!("100")).validate().is_err());
    }

    #[test]
    fn negative_input_is_rejected() {
        let err = form(json!("5"), json!(-1)).validate().unwrap_err();
        assert_eq!(err.to_string(), "purchase price cannot be negative");
    }

    #[test]
    fn zero_is_a_valid_amount() {
        let position = form(json!("0"), json!(0)).validate().unwrap();
        assert_eq!(position.purchase_price, Some(Decimal::ZERO));
    }

    #[test]
    fn half_filled_position_is_rejected() {
        let err = form(json!("5"), json!("")).validate().unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
    }

    #[test]
    fn record_validation_normalises_symbol() {
        let record = HoldingRecord {
            symbol: "msft".into(),
            shares: Some(Decimal::from(2)),
            purchase_price: Some(Decimal::from(300)),
            last_known_price: None,
            last_known_date: None,
        };
        assert_eq!(validate_record(record).unwrap().symbol, "MSFT");
    }
}
