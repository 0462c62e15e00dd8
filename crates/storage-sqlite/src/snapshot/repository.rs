use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use super::model::PositionSnapshotDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use fundledger_core::constants::SNAPSHOT_DELETE_BATCH_SIZE;
use fundledger_core::errors::Result;
use fundledger_core::snapshot::{PositionSnapshot, SnapshotRepositoryTrait};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SnapshotRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SnapshotRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl SnapshotRepositoryTrait for SnapshotRepository {
    fn get_rows_for_day(
        &self,
        input_fund_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<PositionSnapshot>> {
        use crate::schema::position_snapshots::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let rows = position_snapshots
            .filter(fund_id.eq(input_fund_id))
            .filter(snapshot_date.eq(date.format(DATE_FORMAT).to_string()))
            .order(ticker.asc())
            .load::<PositionSnapshotDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(PositionSnapshot::from).collect())
    }

    fn get_rows_in_range(
        &self,
        input_fund_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PositionSnapshot>> {
        use crate::schema::position_snapshots::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let rows = position_snapshots
            .filter(fund_id.eq(input_fund_id))
            .filter(snapshot_date.ge(start.format(DATE_FORMAT).to_string()))
            .filter(snapshot_date.le(end.format(DATE_FORMAT).to_string()))
            .order((snapshot_date.asc(), ticker.asc()))
            .load::<PositionSnapshotDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(PositionSnapshot::from).collect())
    }

    async fn upsert_rows(&self, rows: &[PositionSnapshot]) -> Result<()> {
        use crate::schema::position_snapshots::dsl::*;

        if rows.is_empty() {
            debug!("upsert_rows called with no rows. Nothing to save.");
            return Ok(());
        }

        let db_models: Vec<PositionSnapshotDB> = rows
            .iter()
            .cloned()
            .map(PositionSnapshotDB::from)
            .collect();
        self.writer
            .exec(move |conn| {
                // REPLACE resolves on the (fund_id, ticker, snapshot_date)
                // unique key as well as the id, so reruns never grow the
                // row count.
                diesel::replace_into(position_snapshots)
                    .values(&db_models)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn delete_day(&self, input_fund_id: &str, date: NaiveDate) -> Result<usize> {
        use crate::schema::position_snapshots::dsl::*;

        let fund = input_fund_id.to_string();
        let date_str = date.format(DATE_FORMAT).to_string();
        self.writer
            .exec(move |conn| {
                let ids: Vec<String> = position_snapshots
                    .filter(fund_id.eq(&fund))
                    .filter(snapshot_date.eq(&date_str))
                    .select(id)
                    .load::<String>(conn)
                    .map_err(StorageError::from)?;

                let mut removed = 0usize;
                for chunk in ids.chunks(SNAPSHOT_DELETE_BATCH_SIZE) {
                    removed += diesel::delete(position_snapshots.filter(id.eq_any(chunk)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(removed)
            })
            .await
    }

    fn count_rows_for_day(&self, input_fund_id: &str, date: NaiveDate) -> Result<i64> {
        use crate::schema::position_snapshots::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        position_snapshots
            .filter(fund_id.eq(input_fund_id))
            .filter(snapshot_date.eq(date.format(DATE_FORMAT).to_string()))
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(|e| StorageError::from(e).into())
    }

    fn dates_with_rows(
        &self,
        input_fund_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        use crate::schema::position_snapshots::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let dates: Vec<String> = position_snapshots
            .filter(fund_id.eq(input_fund_id))
            .filter(snapshot_date.ge(start.format(DATE_FORMAT).to_string()))
            .filter(snapshot_date.le(end.format(DATE_FORMAT).to_string()))
            .select(snapshot_date)
            .distinct()
            .load::<String>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(dates
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
            .collect())
    }

    fn latest_close_price(
        &self,
        input_fund_id: &str,
        input_ticker: &str,
        before: NaiveDate,
    ) -> Result<Option<Decimal>> {
        use crate::schema::position_snapshots::dsl::*;
        let mut conn = get_connection(&self.pool)?;
        let price: Option<String> = position_snapshots
            .filter(fund_id.eq(input_fund_id))
            .filter(ticker.eq(input_ticker))
            .filter(snapshot_date.lt(before.format(DATE_FORMAT).to_string()))
            .order(snapshot_date.desc())
            .select(current_price)
            .first::<String>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(price.and_then(|p| Decimal::from_str(&p).ok()))
    }
}
