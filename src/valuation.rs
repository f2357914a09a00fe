// src/valuation.rs
//! Holding performance and portfolio aggregation.
//!
//! Everything here is pure and total. Arithmetic stays at full decimal
//! precision; rounding to cents happens only in the `rounded()` views handed
//! to the API layer. Products that leave `Decimal` range are dropped with a
//! warning instead of panicking.

use crate::models::Holding;
use log::warn;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

const DISPLAY_DP: u32 = 2;

fn round_for_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// `gain / base * 100`, zero when there is no positive base, `None` when the
/// ratio does not fit.
fn percent_of(gain: Decimal, base: Decimal) -> Option<Decimal> {
    if base > Decimal::ZERO {
        gain.checked_div(base)?.checked_mul(Decimal::ONE_HUNDRED)
    } else {
        Some(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Gain,
    Loss,
}

impl Trend {
    fn of(gain_loss: Decimal) -> Self {
        if gain_loss >= Decimal::ZERO {
            Trend::Gain
        } else {
            Trend::Loss
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub initial_investment: Decimal,
    pub current_value: Decimal,
    pub gain_loss: Decimal,
    pub percent_change: Decimal,
}

impl Performance {
    pub fn trend(&self) -> Trend {
        Trend::of(self.gain_loss)
    }

    pub fn rounded(&self) -> Self {
        Self {
            initial_investment: round_for_display(self.initial_investment),
            current_value: round_for_display(self.current_value),
            gain_loss: round_for_display(self.gain_loss),
            percent_change: round_for_display(self.percent_change),
        }
    }
}

/// Performance of one holding at `current_price`.
///
/// `None` is the unquantified state: shares, purchase price or the current
/// price is missing. Amounts too large to multiply out are treated the same.
pub fn compute_performance(holding: &Holding, current_price: Option<Decimal>) -> Option<Performance> {
    let shares = holding.shares?;
    let purchase_price = holding.purchase_price?;
    let current_price = current_price?;

    let performance = (|| {
        let initial_investment = shares.checked_mul(purchase_price)?;
        let current_value = shares.checked_mul(current_price)?;
        let gain_loss = current_value.checked_sub(initial_investment)?;
        Some(Performance {
            initial_investment,
            current_value,
            gain_loss,
            percent_change: percent_of(gain_loss, initial_investment)?,
        })
    })();
    if performance.is_none() {
        warn!(
            "Performance of {} ({}) is out of range, leaving it unquantified",
            holding.id, holding.symbol
        );
    }
    performance
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub total_investment: Decimal,
    pub total_gain_loss: Decimal,
    pub percentage_change: Decimal,
    pub quantified_holdings: usize,
    pub total_holdings: usize,
}

impl PortfolioSummary {
    pub fn trend(&self) -> Trend {
        Trend::of(self.total_gain_loss)
    }

    pub fn rounded(&self) -> Self {
        Self {
            total_value: round_for_display(self.total_value),
            total_investment: round_for_display(self.total_investment),
            total_gain_loss: round_for_display(self.total_gain_loss),
            percentage_change: round_for_display(self.percentage_change),
            ..self.clone()
        }
    }
}

fn accumulate(total: Decimal, shares: Decimal, price: Decimal) -> Option<Decimal> {
    total.checked_add(shares.checked_mul(price)?)
}

/// Portfolio-wide totals priced at each holding's stored snapshot.
///
/// A holding adds to every total it has the inputs for: shares and snapshot
/// price feed `total_value`, shares and purchase price feed
/// `total_investment`. Missing inputs contribute zero.
pub fn summarize(holdings: &[Holding]) -> PortfolioSummary {
    let mut total_value = Decimal::ZERO;
    let mut total_investment = Decimal::ZERO;
    let mut quantified_holdings = 0;

    for holding in holdings {
        if let (Some(shares), Some(price)) = (holding.shares, holding.last_known_price) {
            match accumulate(total_value, shares, price) {
                Some(total) => total_value = total,
                None => warn!(
                    "Value of {} ({}) is out of range, left out of the summary",
                    holding.id, holding.symbol
                ),
            }
        }
        if let (Some(shares), Some(cost)) = (holding.shares, holding.purchase_price) {
            match accumulate(total_investment, shares, cost) {
                Some(total) => {
                    total_investment = total;
                    quantified_holdings += 1;
                }
                None => warn!(
                    "Cost basis of {} ({}) is out of range, left out of the summary",
                    holding.id, holding.symbol
                ),
            }
        }
    }

    let total_gain_loss = total_value
        .checked_sub(total_investment)
        .unwrap_or(Decimal::ZERO);
    PortfolioSummary {
        total_value,
        total_investment,
        total_gain_loss,
        percentage_change: percent_of(total_gain_loss, total_investment).unwrap_or(Decimal::ZERO),
        quantified_holdings,
        total_holdings: holdings.len(),
    }
}
