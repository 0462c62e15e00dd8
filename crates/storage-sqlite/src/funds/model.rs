//! Database model for funds.

use chrono::{NaiveDateTime, TimeZone, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use fundledger_core::calendar::Market;
use fundledger_core::funds::Fund;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

#[derive(Debug, Clone, Queryable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::funds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct FundDB {
    pub id: String,
    pub name: String,
    pub base_currency: String,
    pub trading_timezone: String,
    pub market: String,
    pub is_production: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FundDB> for Fund {
    fn from(db: FundDB) -> Self {
        Self {
            id: db.id.clone(),
            name: db.name,
            base_currency: db.base_currency,
            trading_timezone: db.trading_timezone,
            market: Market::from_str(&db.market).unwrap_or_else(|_| {
                log::warn!("Unknown market '{}' for fund {}", db.market, db.id);
                Market::Any
            }),
            is_production: db.is_production,
            created_at: parse_timestamp(&db.created_at),
            updated_at: parse_timestamp(&db.updated_at),
        }
    }
}

impl From<Fund> for FundDB {
    fn from(domain: Fund) -> Self {
        Self {
            id: domain.id,
            name: domain.name,
            base_currency: domain.base_currency,
            trading_timezone: domain.trading_timezone,
            market: domain.market.as_str().to_string(),
            is_production: domain.is_production,
            created_at: domain.created_at.format(TIMESTAMP_FORMAT).to_string(),
            updated_at: domain.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

fn parse_timestamp(value: &str) -> chrono::DateTime<Utc> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(|e| {
            log::error!("Failed to parse stored timestamp '{}': {}", value, e);
            Utc::now()
        })
}
