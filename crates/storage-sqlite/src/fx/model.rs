//! Database model for daily exchange rates.

use chrono::NaiveDate;
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use fundledger_core::fx::ExchangeRate;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::fx_rates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct FxRateDB {
    pub rate_date: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: String,
    pub source: String,
}

impl From<FxRateDB> for ExchangeRate {
    fn from(db: FxRateDB) -> Self {
        Self {
            from_currency: db.from_currency,
            to_currency: db.to_currency,
            rate: Decimal::from_str(&db.rate).unwrap_or_else(|e| {
                log::error!("Failed to parse stored fx rate '{}': {}", db.rate, e);
                Decimal::ZERO
            }),
            rate_date: NaiveDate::parse_from_str(&db.rate_date, DATE_FORMAT).unwrap_or_default(),
            source: db.source,
        }
    }
}

impl From<ExchangeRate> for FxRateDB {
    fn from(domain: ExchangeRate) -> Self {
        Self {
            rate_date: domain.rate_date.format(DATE_FORMAT).to_string(),
            from_currency: domain.from_currency,
            to_currency: domain.to_currency,
            rate: domain.rate.to_string(),
            source: domain.source,
        }
    }
}
