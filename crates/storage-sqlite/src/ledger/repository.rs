use chrono::NaiveDate;
use chrono_tz::Tz;
use diesel::prelude::*;
use std::sync::Arc;

use super::model::TradeDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use fundledger_core::errors::Result;
use fundledger_core::ledger::{LedgerRepositoryTrait, Trade};

#[derive(Clone)]
pub struct LedgerRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LedgerRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// Appends trades to the ledger. The ledger is append-only; there is no
    /// update or delete path.
    pub async fn append(&self, new_trades: Vec<Trade>) -> Result<()> {
        use crate::schema::trades::dsl::*;

        if new_trades.is_empty() {
            return Ok(());
        }
        let db_models: Vec<TradeDB> = new_trades.into_iter().map(TradeDB::from).collect();
        self.writer
            .exec(move |conn| {
                diesel::insert_into(trades)
                    .values(&db_models)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

impl LedgerRepositoryTrait for LedgerRepository {
    fn trades_for_fund(&self, input_fund_id: &str) -> Result<Vec<Trade>> {
        use crate::schema::trades::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        // ISO-8601 text sorts chronologically; id breaks same-instant ties.
        let rows = trades
            .filter(fund_id.eq(input_fund_id))
            .order((trade_date.asc(), id.asc()))
            .load::<TradeDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(Trade::from).collect())
    }

    fn earliest_trade_date(&self, input_fund_id: &str, tz: Tz) -> Result<Option<NaiveDate>> {
        use crate::schema::trades::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let first = trades
            .filter(fund_id.eq(input_fund_id))
            .order((trade_date.asc(), id.asc()))
            .first::<TradeDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(first.map(|row| Trade::from(row).trading_date(tz)))
    }
}
