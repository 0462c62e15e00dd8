//! Database model for ledger trades.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use fundledger_core::ledger::Trade;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::trades)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TradeDB {
    pub id: String,
    pub fund_id: String,
    pub ticker: String,
    pub action: String,
    pub quantity: String,
    pub unit_price: String,
    pub trade_date: String,
    pub cost_basis: String,
    pub currency: String,
    pub reason: String,
}

impl From<TradeDB> for Trade {
    fn from(db: TradeDB) -> Self {
        Self {
            id: db.id.clone(),
            fund_id: db.fund_id,
            ticker: db.ticker,
            action: db.action,
            quantity: parse_decimal(&db.quantity, &db.id),
            unit_price: parse_decimal(&db.unit_price, &db.id),
            trade_date: NaiveDateTime::parse_from_str(&db.trade_date, TIMESTAMP_FORMAT)
                .map(|naive| Utc.from_utc_datetime(&naive))
                .unwrap_or_else(|e| {
                    log::error!(
                        "Failed to parse trade_date '{}' for trade {}: {}",
                        db.trade_date,
                        db.id,
                        e
                    );
                    Utc::now()
                }),
            cost_basis: parse_decimal(&db.cost_basis, &db.id),
            currency: db.currency,
            reason: db.reason,
        }
    }
}

impl From<Trade> for TradeDB {
    fn from(domain: Trade) -> Self {
        Self {
            id: domain.id,
            fund_id: domain.fund_id,
            ticker: domain.ticker,
            action: domain.action,
            quantity: domain.quantity.to_string(),
            unit_price: domain.unit_price.to_string(),
            trade_date: domain.trade_date.format(TIMESTAMP_FORMAT).to_string(),
            cost_basis: domain.cost_basis.to_string(),
            currency: domain.currency,
            reason: domain.reason,
        }
    }
}

fn parse_decimal(value: &str, trade_id: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_else(|e| {
        log::error!(
            "Failed to parse decimal '{}' for trade {}: {}",
            value,
            trade_id,
            e
        );
        Decimal::ZERO
    })
}
