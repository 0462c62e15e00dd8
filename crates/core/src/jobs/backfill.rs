use chrono::{Duration, NaiveDate};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::job_model::{BackfillReport, RetryEntry};
use super::job_traits::{JobTrackerTrait, RetryQueueTrait};
use super::sync_job::day_actions;
use crate::calendar::TradingCalendarTrait;
use crate::constants::{
    FALLBACK_EXCHANGE_RATE, GAP_BACKFILL_JOB_NAME, PRICE_FETCH_BATCH_SIZE, SNAPSHOT_CHUNK_SIZE,
    TRADING_DAY_LOOKBACK_DAYS,
};
use crate::errors::{Error, Result};
use crate::funds::Fund;
use crate::fx::{normalize_currency_code, FxRateProviderTrait};
use crate::ledger::LedgerRepositoryTrait;
use crate::market_data::{PriceSeries, PriceSourceTrait};
use crate::positions::PositionBuilder;
use crate::snapshot::{PositionSnapshot, SnapshotRepositoryTrait};
use crate::utils::time_utils;

/// Date-range snapshot reconstruction for trading days the sync job missed.
///
/// The optimization over running the single-date sync once per day: each
/// ticker's price history is fetched once for the whole range (O(tickers)
/// network calls instead of O(days x tickers)), then every missing day is
/// replayed independently against the pre-fetched series.
pub struct GapBackfill {
    ledger: Arc<dyn LedgerRepositoryTrait>,
    snapshots: Arc<dyn SnapshotRepositoryTrait>,
    price_source: Arc<dyn PriceSourceTrait>,
    fx: Arc<dyn FxRateProviderTrait>,
    calendar: Arc<dyn TradingCalendarTrait>,
    tracker: Arc<dyn JobTrackerTrait>,
    retry_queue: Arc<dyn RetryQueueTrait>,
    /// Shared with [`super::PriceSyncJob`]: backfill holds the same lock for
    /// its entire run so the two jobs never race on a day's rows.
    run_lock: Arc<Mutex<()>>,
}

impl GapBackfill {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<dyn LedgerRepositoryTrait>,
        snapshots: Arc<dyn SnapshotRepositoryTrait>,
        price_source: Arc<dyn PriceSourceTrait>,
        fx: Arc<dyn FxRateProviderTrait>,
        calendar: Arc<dyn TradingCalendarTrait>,
        tracker: Arc<dyn JobTrackerTrait>,
        retry_queue: Arc<dyn RetryQueueTrait>,
        run_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            ledger,
            snapshots,
            price_source,
            fx,
            calendar,
            tracker,
            retry_queue,
            run_lock,
        }
    }

    /// Trading days in `[start, end]` the fund holds trades for but has no
    /// snapshot rows, bounded below by the fund's earliest trade date.
    pub fn find_missing_days(
        &self,
        fund: &Fund,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let Some(earliest) = self.ledger.earliest_trade_date(&fund.id, fund.timezone())? else {
            return Ok(Vec::new());
        };
        let effective_start = start.max(earliest);
        let covered = self.snapshots.dates_with_rows(&fund.id, effective_start, end)?;

        Ok(time_utils::get_days_between(effective_start, end)
            .into_iter()
            .filter(|day| self.calendar.is_trading_day(*day, fund.market))
            .filter(|day| !covered.contains(day))
            .collect())
    }

    /// Rebuilds snapshot rows for every missing trading day in the range.
    pub async fn backfill(
        &self,
        funds: &[Fund],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BackfillReport> {
        let guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(
                    "Backfill {}..={} skipped: another run holds the lock",
                    start, end
                );
                self.tracker
                    .record_skipped(
                        GAP_BACKFILL_JOB_NAME,
                        end,
                        None,
                        "concurrent run already in progress",
                    )
                    .await?;
                return Ok(BackfillReport::skipped("concurrent run already in progress"));
            }
        };

        let result = self.backfill_locked(funds, start, end).await;
        drop(guard);
        result
    }

    async fn backfill_locked(
        &self,
        funds: &[Fund],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BackfillReport> {
        if start > end {
            return Err(Error::Job(format!(
                "backfill range is inverted: {} > {}",
                start, end
            )));
        }

        let mut report = BackfillReport::default();
        // Day -> funds that produced rows for it; drives per-day validation.
        let mut touched_days: BTreeSet<NaiveDate> = BTreeSet::new();
        let mut funds_by_day: HashMap<NaiveDate, Vec<String>> = HashMap::new();

        for fund in funds {
            let missing = self.find_missing_days(fund, start, end)?;
            if missing.is_empty() {
                debug!("Fund {} has no missing days in {}..={}", fund.id, start, end);
                continue;
            }
            report.missing_days_found += missing.len();
            info!(
                "Backfilling {} missing days for fund {} ({}..={})",
                missing.len(),
                fund.id,
                missing[0],
                missing[missing.len() - 1]
            );

            let trades = self.ledger.trades_for_fund(&fund.id)?;
            let tickers: BTreeSet<String> =
                trades.iter().map(|t| t.ticker.clone()).collect();
            let histories = self.fetch_histories(&tickers, start, end).await;

            let mut rows: Vec<PositionSnapshot> = Vec::new();
            for day in &missing {
                let positions = PositionBuilder::build(&trades, *day, fund.timezone());
                if positions.is_empty() {
                    continue;
                }
                let actions = day_actions(&trades, *day, fund.timezone());

                for (ticker, position) in &positions {
                    let Some(point) = histories
                        .get(ticker)
                        .and_then(|series| series.close_on_or_before(*day))
                    else {
                        debug!("No price for {} on {} during backfill", ticker, day);
                        continue;
                    };

                    let rate = self.rate_for(fund, &position.currency, *day, &mut report)?;
                    let action = actions
                        .get(ticker)
                        .copied()
                        .unwrap_or_default();
                    rows.push(PositionSnapshot::from_position(
                        fund, position, *day, point.close, rate, action,
                    ));
                }
                touched_days.insert(*day);
                funds_by_day.entry(*day).or_default().push(fund.id.clone());
            }

            self.insert_chunked(fund, &rows, &mut report).await?;
            report.funds_processed.push(fund.name.clone());
        }

        // Read-back validation: a day only counts as repaired when every fund
        // that produced rows for it can be seen in a follow-up query. An
        // insert that "succeeded" client-side but left nothing behind (e.g. a
        // constraint silently dropping rows) must surface as a failure.
        for day in touched_days {
            let execution = self.tracker.start(GAP_BACKFILL_JOB_NAME, day, None).await?;
            let fund_ids = funds_by_day.remove(&day).unwrap_or_default();
            let mut confirmed = true;
            for fund_id in &fund_ids {
                if self.snapshots.count_rows_for_day(fund_id, day)? == 0 {
                    confirmed = false;
                    warn!("Read-back found no rows for fund {} on {}", fund_id, day);
                }
            }
            if confirmed {
                self.tracker.complete(&execution.id, fund_ids).await?;
                report.days_confirmed += 1;
            } else {
                self.tracker
                    .fail(&execution.id, "post-write validation found missing rows")
                    .await?;
                self.retry_queue
                    .add(RetryEntry {
                        job_name: GAP_BACKFILL_JOB_NAME.to_string(),
                        target_date: day,
                        entity_id: fund_ids.join(","),
                        entity_type: "day".to_string(),
                        failure_reason: "post-write validation failed".to_string(),
                        error_message: "no snapshot rows visible after insert".to_string(),
                        context: serde_json::json!({ "funds": fund_ids }),
                    })
                    .await?;
                report.days_failed += 1;
            }
        }

        Ok(report)
    }

    /// One history fetch per ticker for the whole range, batched to respect
    /// the provider's rate limit. Failures leave the ticker out of the map;
    /// affected days simply skip it.
    async fn fetch_histories(
        &self,
        tickers: &BTreeSet<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HashMap<String, PriceSeries> {
        // Widen the window backwards so the first days of the range can fall
        // back to a prior close.
        let fetch_start = start - Duration::days(TRADING_DAY_LOOKBACK_DAYS);
        let fetch_end = end.succ_opt().unwrap_or(end);

        let ticker_list: Vec<String> = tickers.iter().cloned().collect();
        let mut histories = HashMap::new();

        for chunk in ticker_list.chunks(PRICE_FETCH_BATCH_SIZE) {
            let fetches: Vec<_> = chunk
                .iter()
                .map(|ticker| {
                    let source = Arc::clone(&self.price_source);
                    let ticker = ticker.clone();
                    async move {
                        let outcome = source
                            .fetch_close_prices(&ticker, fetch_start, fetch_end)
                            .await;
                        (ticker, outcome)
                    }
                })
                .collect();

            for (ticker, outcome) in futures::future::join_all(fetches).await {
                match outcome {
                    Ok(series) if !series.is_empty() => {
                        histories.insert(ticker, series);
                    }
                    Ok(_) => debug!("No history for {} in {}..{}", ticker, fetch_start, fetch_end),
                    Err(e) => warn!("History fetch failed for {}: {}", ticker, e),
                }
            }
        }

        histories
    }

    fn rate_for(
        &self,
        fund: &Fund,
        currency: &str,
        date: NaiveDate,
        report: &mut BackfillReport,
    ) -> Result<Decimal> {
        let currency = normalize_currency_code(currency);
        let base = normalize_currency_code(&fund.base_currency);
        if currency == base {
            return Ok(Decimal::ONE);
        }
        match self.fx.get_rate(date, &currency, &base)? {
            Some(rate) => Ok(rate),
            None => {
                let fallback = Decimal::from_str(FALLBACK_EXCHANGE_RATE)
                    .map_err(|e| Error::Unexpected(e.to_string()))?;
                warn!(
                    "No {}->{} rate for {} during backfill. Using fallback {}.",
                    currency, base, date, fallback
                );
                report.fallback_rates_used += 1;
                Ok(fallback)
            }
        }
    }

    /// Inserts rows in bounded chunks. Each chunk failure is caught, queued
    /// for retry with enough context to reprocess just that unit, and does
    /// not abort the rest of the backfill.
    async fn insert_chunked(
        &self,
        fund: &Fund,
        rows: &[PositionSnapshot],
        report: &mut BackfillReport,
    ) -> Result<()> {
        for (index, chunk) in rows.chunks(SNAPSHOT_CHUNK_SIZE).enumerate() {
            match self.snapshots.upsert_rows(chunk).await {
                Ok(()) => report.rows_written += chunk.len(),
                Err(e) => {
                    error!(
                        "Chunk {} ({} rows) failed for fund {}: {}",
                        index,
                        chunk.len(),
                        fund.id,
                        e
                    );
                    report.chunks_failed += 1;
                    let first_day = chunk.first().map(|r| r.snapshot_date);
                    let last_day = chunk.last().map(|r| r.snapshot_date);
                    self.retry_queue
                        .add(RetryEntry {
                            job_name: GAP_BACKFILL_JOB_NAME.to_string(),
                            target_date: last_day.unwrap_or_default(),
                            entity_id: fund.id.clone(),
                            entity_type: "chunk".to_string(),
                            failure_reason: "chunk insert failed".to_string(),
                            error_message: e.to_string(),
                            context: serde_json::json!({
                                "chunkIndex": index,
                                "firstDay": first_day,
                                "lastDay": last_day,
                                "rows": chunk.len(),
                            }),
                        })
                        .await?;
                }
            }
        }
        Ok(())
    }
}
