use chrono::NaiveDate;
use diesel::prelude::*;
use log::debug;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

use super::model::FxRateDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use fundledger_core::errors::Result;
use fundledger_core::fx::{ExchangeRate, FxRateProviderTrait};

#[derive(Clone)]
pub struct FxRateRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl FxRateRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    pub async fn save_rates(&self, rates: Vec<ExchangeRate>) -> Result<()> {
        use crate::schema::fx_rates::dsl::*;

        if rates.is_empty() {
            return Ok(());
        }
        let db_models: Vec<FxRateDB> = rates.into_iter().map(FxRateDB::from).collect();
        self.writer
            .exec(move |conn| {
                diesel::replace_into(fx_rates)
                    .values(&db_models)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    fn lookup(&self, date: NaiveDate, from: &str, to: &str) -> Result<Option<Decimal>> {
        use crate::schema::fx_rates::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let date_str = date.format("%Y-%m-%d").to_string();
        let row = fx_rates
            .filter(rate_date.eq(&date_str))
            .filter(from_currency.eq(from))
            .filter(to_currency.eq(to))
            .first::<FxRateDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.and_then(|r| Decimal::from_str(&r.rate).ok()))
    }
}

impl FxRateProviderTrait for FxRateRepository {
    fn get_rate(
        &self,
        date: NaiveDate,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<Option<Decimal>> {
        if from_currency == to_currency {
            return Ok(Some(Decimal::ONE));
        }

        if let Some(rate) = self.lookup(date, from_currency, to_currency)? {
            return Ok(Some(rate));
        }

        // Only the one direction may be stored; derive the other from it.
        if let Some(inverse) = self.lookup(date, to_currency, from_currency)? {
            if !inverse.is_zero() {
                debug!(
                    "Derived {}->{} rate for {} from the stored inverse",
                    from_currency, to_currency, date
                );
                return Ok(Some(Decimal::ONE / inverse));
            }
        }

        Ok(None)
    }
}
