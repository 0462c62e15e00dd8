use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a ledger trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

/// A single trade from the append-only ledger.
///
/// Trades are the source of truth for holdings. They are never mutated or
/// deleted by this engine; snapshots are always derived by replaying them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub fund_id: String,
    pub ticker: String,
    /// Raw action string as entered ("BUY", "SELL", broker variants).
    pub action: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Instant of the trade. The trading-day key is derived from this by
    /// converting to the fund's trading timezone, never by truncating UTC.
    pub trade_date: DateTime<Utc>,
    pub cost_basis: Decimal,
    pub currency: String,
    /// Free-form entry note; also consulted for action classification since
    /// some upstream feeds only record intent here.
    pub reason: String,
}

impl Trade {
    /// Classifies the trade direction. A trade counts as a SELL when either
    /// the action or the reason text mentions "sell", case-insensitively;
    /// everything else is treated as a BUY.
    pub fn classify(&self) -> TradeAction {
        let action = self.action.to_lowercase();
        let reason = self.reason.to_lowercase();
        if action.contains("sell") || reason.contains("sell") {
            TradeAction::Sell
        } else {
            TradeAction::Buy
        }
    }

    /// The calendar date of this trade in the fund's trading timezone.
    pub fn trading_date(&self, tz: Tz) -> chrono::NaiveDate {
        crate::utils::time_utils::trading_date_from_utc(self.trade_date, tz)
    }
}
