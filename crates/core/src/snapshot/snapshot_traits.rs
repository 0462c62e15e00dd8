use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashSet;

use super::snapshot_model::PositionSnapshot;
use crate::errors::Result;

/// Trait defining the contract for snapshot storage.
///
/// The persisted table is keyed on (fund_id, ticker, snapshot_date); the
/// upsert must be idempotent on that key so repeated writes for a day never
/// grow the row count.
#[async_trait]
pub trait SnapshotRepositoryTrait: Send + Sync {
    fn get_rows_for_day(&self, fund_id: &str, date: NaiveDate) -> Result<Vec<PositionSnapshot>>;

    fn get_rows_in_range(
        &self,
        fund_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PositionSnapshot>>;

    /// Idempotent upsert keyed on (fund_id, ticker, snapshot_date).
    async fn upsert_rows(&self, rows: &[PositionSnapshot]) -> Result<()>;

    /// Removes every row for (fund, date), deleting in bounded batches to
    /// respect storage page limits. Returns the number of rows removed.
    async fn delete_day(&self, fund_id: &str, date: NaiveDate) -> Result<usize>;

    /// Count-only existence check used for post-write validation.
    fn count_rows_for_day(&self, fund_id: &str, date: NaiveDate) -> Result<i64>;

    /// The set of dates in `[start, end]` that already have at least one row.
    fn dates_with_rows(
        &self,
        fund_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<NaiveDate>>;

    /// Most recent stored close price for the ticker strictly before `date`.
    /// Used as the cached-price fallback when a live fetch fails.
    fn latest_close_price(
        &self,
        fund_id: &str,
        ticker: &str,
        before: NaiveDate,
    ) -> Result<Option<Decimal>>;
}
