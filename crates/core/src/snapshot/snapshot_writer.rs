use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use super::snapshot_model::{PositionSnapshot, SnapshotAction};
use super::snapshot_traits::SnapshotRepositoryTrait;
use crate::errors::Result;
use crate::funds::Fund;
use crate::utils::time_utils::EventTime;

/// Writes a day's snapshot rows, enforcing the one-row-per-day invariant.
///
/// The writer is the only component that turns an event timestamp into a
/// snapshot date, and it always does so through the fund's trading timezone.
/// Two calls for the same trading day - one expressed in the trading
/// timezone, one as the equivalent UTC instant - resolve to the same day key
/// and therefore merge instead of duplicating rows.
#[derive(Clone)]
pub struct SnapshotWriter {
    repository: Arc<dyn SnapshotRepositoryTrait>,
}

impl SnapshotWriter {
    pub fn new(repository: Arc<dyn SnapshotRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Inserts or merges `incoming` rows into the fund's snapshot for the
    /// trading day that `at` falls on.
    ///
    /// Merge rules per ticker:
    /// - ticker already has a row today: price-derived fields are refreshed;
    ///   if the incoming row carries trade data (non-HOLD action) the share
    ///   and cost fields are replaced too, so several same-day BUYs collapse
    ///   into one cumulative row;
    /// - ticker is newly held today: the row is appended;
    /// - tickers present today but absent from `incoming` are left untouched.
    pub async fn upsert_day(
        &self,
        fund: &Fund,
        incoming: Vec<PositionSnapshot>,
        at: EventTime,
    ) -> Result<()> {
        if incoming.is_empty() {
            debug!("upsert_day called with no rows for fund {}. Nothing to do.", fund.id);
            return Ok(());
        }

        let day = at.trading_date(fund.timezone());

        // Re-key every incoming row onto the normalized day so callers cannot
        // smuggle a UTC-truncated date past the invariant.
        let incoming: Vec<PositionSnapshot> = incoming
            .into_iter()
            .map(|mut row| {
                row.snapshot_date = day;
                row.id = PositionSnapshot::make_id(&fund.id, &row.ticker, day);
                row.fund_id = fund.id.clone();
                row
            })
            .collect();

        let existing = self.repository.get_rows_for_day(&fund.id, day)?;

        if existing.is_empty() {
            debug!(
                "Inserting {} new snapshot rows for fund {} on {}",
                incoming.len(),
                fund.id,
                day
            );
            return self.repository.upsert_rows(&incoming).await;
        }

        let mut by_ticker: HashMap<String, PositionSnapshot> = existing
            .into_iter()
            .map(|row| (row.ticker.clone(), row))
            .collect();

        let mut merged: Vec<PositionSnapshot> = Vec::with_capacity(incoming.len());
        for row in incoming {
            match by_ticker.remove(&row.ticker) {
                Some(mut current) => {
                    if row.action == SnapshotAction::Hold {
                        current.apply_price_update(&row);
                    } else {
                        current.apply_trade_update(&row);
                    }
                    merged.push(current);
                }
                None => merged.push(row),
            }
        }

        debug!(
            "Merging {} snapshot rows for fund {} on {}",
            merged.len(),
            fund.id,
            day
        );
        self.repository.upsert_rows(&merged).await
    }
}
