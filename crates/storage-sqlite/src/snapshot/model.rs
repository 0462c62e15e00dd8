//! Database model for position snapshot rows.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use fundledger_core::constants::DECIMAL_PRECISION;
use fundledger_core::snapshot::{PositionSnapshot, SnapshotAction};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

#[derive(Debug, Clone, Queryable, QueryableByName, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::position_snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshotDB {
    pub id: String,
    pub fund_id: String,
    pub ticker: String,
    pub snapshot_date: String,
    pub shares: String,
    pub average_price: String,
    pub cost_basis: String,
    pub current_price: String,
    pub market_value: String,
    pub unrealized_pnl: String,
    pub currency: String,
    pub action: String,
    pub base_currency: String,
    pub market_value_base: String,
    pub cost_basis_base: String,
    pub unrealized_pnl_base: String,
    pub exchange_rate: String,
    pub calculated_at: String,
}

impl From<PositionSnapshotDB> for PositionSnapshot {
    fn from(db: PositionSnapshotDB) -> Self {
        Self {
            id: db.id,
            fund_id: db.fund_id,
            ticker: db.ticker,
            snapshot_date: NaiveDate::parse_from_str(&db.snapshot_date, DATE_FORMAT)
                .unwrap_or_default(),
            shares: parse_decimal(&db.shares),
            average_price: parse_decimal(&db.average_price),
            cost_basis: parse_decimal(&db.cost_basis),
            current_price: parse_decimal(&db.current_price),
            market_value: parse_decimal(&db.market_value),
            unrealized_pnl: parse_decimal(&db.unrealized_pnl),
            currency: db.currency,
            action: SnapshotAction::from_str(&db.action).unwrap_or_default(),
            base_currency: db.base_currency,
            market_value_base: parse_decimal(&db.market_value_base),
            cost_basis_base: parse_decimal(&db.cost_basis_base),
            unrealized_pnl_base: parse_decimal(&db.unrealized_pnl_base),
            exchange_rate: parse_decimal(&db.exchange_rate),
            calculated_at: NaiveDateTime::parse_from_str(&db.calculated_at, TIMESTAMP_FORMAT)
                .unwrap_or_else(|e| {
                    log::error!(
                        "Failed to parse stored calculated_at '{}': {}",
                        db.calculated_at,
                        e
                    );
                    Utc::now().naive_utc()
                }),
        }
    }
}

impl From<PositionSnapshot> for PositionSnapshotDB {
    fn from(domain: PositionSnapshot) -> Self {
        Self {
            id: domain.id,
            fund_id: domain.fund_id,
            ticker: domain.ticker,
            snapshot_date: domain.snapshot_date.format(DATE_FORMAT).to_string(),
            shares: round(domain.shares),
            average_price: round(domain.average_price),
            cost_basis: round(domain.cost_basis),
            current_price: round(domain.current_price),
            market_value: round(domain.market_value),
            unrealized_pnl: round(domain.unrealized_pnl),
            currency: domain.currency,
            action: domain.action.to_string(),
            base_currency: domain.base_currency,
            market_value_base: round(domain.market_value_base),
            cost_basis_base: round(domain.cost_basis_base),
            unrealized_pnl_base: round(domain.unrealized_pnl_base),
            exchange_rate: round(domain.exchange_rate),
            calculated_at: domain.calculated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

fn parse_decimal(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_default()
}

fn round(value: Decimal) -> String {
    value.round_dp(DECIMAL_PRECISION).to_string()
}
