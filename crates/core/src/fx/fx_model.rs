use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dated exchange rate between two currencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: String,
}

/// Outcome of a rate lookup, distinguishing a real rate from the constant
/// fallback so that degraded conversions stay observable downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLookup {
    Found(Decimal),
    Fallback(Decimal),
}

impl RateLookup {
    pub fn rate(&self) -> Decimal {
        match self {
            RateLookup::Found(rate) | RateLookup::Fallback(rate) => *rate,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RateLookup::Fallback(_))
    }
}
