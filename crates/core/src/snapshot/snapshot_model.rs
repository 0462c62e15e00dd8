//! Snapshot row domain model.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};
use crate::funds::Fund;
use crate::positions::RunningPosition;

/// Provenance of a snapshot row for a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotAction {
    Buy,
    Sell,
    /// No trade activity that day; the row carries forward price updates only.
    #[default]
    Hold,
}

impl fmt::Display for SnapshotAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotAction::Buy => write!(f, "BUY"),
            SnapshotAction::Sell => write!(f, "SELL"),
            SnapshotAction::Hold => write!(f, "HOLD"),
        }
    }
}

impl FromStr for SnapshotAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(SnapshotAction::Buy),
            "SELL" => Ok(SnapshotAction::Sell),
            "HOLD" => Ok(SnapshotAction::Hold),
            other => {
                Err(ValidationError::InvalidInput(format!("Unknown snapshot action: {}", other))
                    .into())
            }
        }
    }
}

/// One (fund, ticker, trading day) row of holdings and valuation.
///
/// Invariant: for a given (fund_id, ticker, snapshot_date) at most one row
/// exists. The id encodes the unique key so idempotent upserts can rely on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub id: String, // "FUNDID_TICKER_YYYY-MM-DD"
    pub fund_id: String,
    pub ticker: String,
    pub snapshot_date: NaiveDate,
    pub shares: Decimal,
    pub average_price: Decimal,
    pub cost_basis: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    /// Currency of the position itself.
    pub currency: String,
    pub action: SnapshotAction,
    /// Fund reporting currency the `*_base` fields are expressed in.
    pub base_currency: String,
    pub market_value_base: Decimal,
    pub cost_basis_base: Decimal,
    pub unrealized_pnl_base: Decimal,
    /// Rate applied to produce the base fields (1 when currencies match).
    pub exchange_rate: Decimal,
    pub calculated_at: NaiveDateTime,
}

impl PositionSnapshot {
    pub fn make_id(fund_id: &str, ticker: &str, date: NaiveDate) -> String {
        format!("{}_{}_{}", fund_id, ticker, date.format("%Y-%m-%d"))
    }

    /// Builds a valued snapshot row from a rebuilt running position.
    pub fn from_position(
        fund: &Fund,
        position: &RunningPosition,
        snapshot_date: NaiveDate,
        current_price: Decimal,
        exchange_rate: Decimal,
        action: SnapshotAction,
    ) -> Self {
        let market_value = position.shares * current_price;
        let unrealized_pnl = market_value - position.cost;
        PositionSnapshot {
            id: Self::make_id(&fund.id, &position.ticker, snapshot_date),
            fund_id: fund.id.clone(),
            ticker: position.ticker.clone(),
            snapshot_date,
            shares: position.shares,
            average_price: position.average_price(),
            cost_basis: position.cost,
            current_price,
            market_value,
            unrealized_pnl,
            currency: position.currency.clone(),
            action,
            base_currency: fund.base_currency.clone(),
            market_value_base: market_value * exchange_rate,
            cost_basis_base: position.cost * exchange_rate,
            unrealized_pnl_base: unrealized_pnl * exchange_rate,
            exchange_rate,
            calculated_at: Utc::now().naive_utc(),
        }
    }

    /// Copies the price-derived fields from a fresher row for the same
    /// (fund, ticker, day). Shares and cost basis are left untouched.
    pub fn apply_price_update(&mut self, incoming: &PositionSnapshot) {
        self.current_price = incoming.current_price;
        self.market_value = incoming.market_value;
        self.unrealized_pnl = incoming.unrealized_pnl;
        self.market_value_base = incoming.market_value_base;
        self.unrealized_pnl_base = incoming.unrealized_pnl_base;
        self.exchange_rate = incoming.exchange_rate;
        self.calculated_at = incoming.calculated_at;
    }

    /// Folds a same-day trade update into this row: cumulative share and
    /// cost quantities replace the stored ones so two BUYs on one day
    /// collapse into a single row instead of appending a second.
    pub fn apply_trade_update(&mut self, incoming: &PositionSnapshot) {
        self.apply_price_update(incoming);
        self.shares = incoming.shares;
        self.average_price = incoming.average_price;
        self.cost_basis = incoming.cost_basis;
        self.cost_basis_base = incoming.cost_basis_base;
        self.currency = incoming.currency.clone();
        self.action = incoming.action;
    }
}
