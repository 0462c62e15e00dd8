use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use super::job_model::{RetryEntry, SyncReport};
use super::job_traits::{JobTrackerTrait, RetryQueueTrait};
use crate::calendar::{Market, TradingCalendarTrait};
use crate::constants::{
    FALLBACK_EXCHANGE_RATE, MARKET_OPEN_MINUTES, PRICE_FETCH_BATCH_SIZE, PRICE_SYNC_JOB_NAME,
    TRADING_DAY_LOOKBACK_DAYS,
};
use crate::errors::{CalculatorError, Error, Result};
use crate::funds::{Fund, FundRepositoryTrait};
use crate::fx::{normalize_currency_code, FxRateProviderTrait, RateLookup};
use crate::ledger::{LedgerRepositoryTrait, Trade, TradeAction};
use crate::market_data::PriceSourceTrait;
use crate::positions::{PositionBuilder, RunningPosition};
use crate::snapshot::{PositionSnapshot, SnapshotAction, SnapshotRepositoryTrait};
use crate::utils::time_utils;

/// Timezone in which the "is the market open yet" cutover is evaluated when
/// no explicit target date is given.
const MARKET_TZ: Tz = chrono_tz::America::New_York;

/// Single-date price synchronization job.
///
/// For a target trading day, rebuilds every production fund's holdings from
/// the ledger, prices all held tickers in parallel against the rate-limited
/// price source, converts to the fund's base currency, and atomically
/// replaces that day's snapshot rows. One non-blocking lock serializes all
/// runs process-wide; the same lock is shared with [`super::GapBackfill`].
pub struct PriceSyncJob {
    funds: Arc<dyn FundRepositoryTrait>,
    ledger: Arc<dyn LedgerRepositoryTrait>,
    snapshots: Arc<dyn SnapshotRepositoryTrait>,
    price_source: Arc<dyn PriceSourceTrait>,
    fx: Arc<dyn FxRateProviderTrait>,
    calendar: Arc<dyn TradingCalendarTrait>,
    tracker: Arc<dyn JobTrackerTrait>,
    retry_queue: Arc<dyn RetryQueueTrait>,
    run_lock: Arc<Mutex<()>>,
}

/// Per-fund pricing outcome collected from the parallel fetch step.
struct FundPricing {
    prices: HashMap<String, Decimal>,
    failed: Vec<String>,
}

impl PriceSyncJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        funds: Arc<dyn FundRepositoryTrait>,
        ledger: Arc<dyn LedgerRepositoryTrait>,
        snapshots: Arc<dyn SnapshotRepositoryTrait>,
        price_source: Arc<dyn PriceSourceTrait>,
        fx: Arc<dyn FxRateProviderTrait>,
        calendar: Arc<dyn TradingCalendarTrait>,
        tracker: Arc<dyn JobTrackerTrait>,
        retry_queue: Arc<dyn RetryQueueTrait>,
    ) -> Self {
        Self {
            funds,
            ledger,
            snapshots,
            price_source,
            fx,
            calendar,
            tracker,
            retry_queue,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The process-wide run lock, shared with the backfill job.
    pub fn run_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.run_lock)
    }

    /// Runs the sync for `target_date`, or for the most recent trading day
    /// when none is given. A run already in progress is recorded as a
    /// skipped execution and returns without touching any snapshot.
    pub async fn run(&self, target_date: Option<NaiveDate>) -> Result<SyncReport> {
        let guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let date = target_date.unwrap_or_else(|| Utc::now().date_naive());
                warn!("Price sync for {} skipped: another run holds the lock", date);
                self.tracker
                    .record_skipped(
                        PRICE_SYNC_JOB_NAME,
                        date,
                        None,
                        "concurrent run already in progress",
                    )
                    .await?;
                return Ok(SyncReport::skipped("concurrent run already in progress"));
            }
        };

        let result = self.run_locked(target_date).await;
        drop(guard);
        result
    }

    async fn run_locked(&self, target_date: Option<NaiveDate>) -> Result<SyncReport> {
        let started = Instant::now();

        let date = match target_date {
            Some(date) => date,
            None => self.resolve_target_date(Utc::now())?,
        };

        // Defends against stale cron triggers firing on holidays.
        if !self.calendar.is_trading_day(date, Market::Any) {
            let holiday = self
                .calendar
                .holiday_name(date)
                .unwrap_or_else(|| "non-trading day".to_string());
            warn!("Price sync for {} skipped: {}", date, holiday);
            self.tracker
                .record_skipped(PRICE_SYNC_JOB_NAME, date, None, &holiday)
                .await?;
            let mut report = SyncReport::skipped(holiday);
            report.target_date = Some(date);
            return Ok(report);
        }

        let execution = self.tracker.start(PRICE_SYNC_JOB_NAME, date, None).await?;

        match self.sync_all_funds(date).await {
            Ok(report) => {
                self.tracker
                    .complete(&execution.id, report.funds_processed.clone())
                    .await?;
                info!(
                    "Price sync for {} completed in {:?}: {} funds, {} tickers priced, {} failed",
                    date,
                    started.elapsed(),
                    report.funds_processed.len(),
                    report.tickers_priced,
                    report.tickers_failed
                );
                Ok(report)
            }
            Err(e) => {
                error!("Price sync for {} failed: {}", date, e);
                self.tracker.fail(&execution.id, &e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn sync_all_funds(&self, date: NaiveDate) -> Result<SyncReport> {
        let funds = self.funds.list_production_funds()?;
        if funds.is_empty() {
            return Err(Error::Job("no production funds found".to_string()));
        }

        let mut report = SyncReport {
            target_date: Some(date),
            ..Default::default()
        };

        for fund in &funds {
            let trades = self.ledger.trades_for_fund(&fund.id)?;
            let positions = PositionBuilder::build(&trades, date, fund.timezone());
            if positions.is_empty() {
                debug!("Fund {} has no holdings as of {}. Skipping.", fund.id, date);
                report.funds_skipped.push(fund.name.clone());
                continue;
            }

            let pricing = self.fetch_prices(fund, &positions, date).await;
            report.tickers_priced += pricing.prices.len();
            report.tickers_failed += pricing.failed.len();

            if pricing.prices.is_empty() {
                // Writing an empty day would destroy the existing snapshot.
                warn!(
                    "Every price fetch failed for fund {} on {}. Leaving existing rows untouched.",
                    fund.id, date
                );
                report.funds_skipped.push(fund.name.clone());
                continue;
            }

            let rows =
                self.build_rows(fund, &positions, &pricing.prices, &trades, date, &mut report)?;

            if let Err(e) = self.replace_day(fund, date, &rows).await {
                error!("Snapshot replace failed for fund {} on {}: {}", fund.id, date, e);
                self.retry_queue
                    .add(RetryEntry {
                        job_name: PRICE_SYNC_JOB_NAME.to_string(),
                        target_date: date,
                        entity_id: fund.id.clone(),
                        entity_type: "fund".to_string(),
                        failure_reason: "snapshot replace failed".to_string(),
                        error_message: e.to_string(),
                        context: serde_json::json!({ "rows": rows.len() }),
                    })
                    .await?;
                report.funds_skipped.push(fund.name.clone());
                continue;
            }

            report.funds_processed.push(fund.name.clone());
        }

        Ok(report)
    }

    /// Prices every held ticker, batching concurrent fetches to stay under
    /// the provider's rate limit. Each ticker independently resolves to a
    /// close price, a cached prior price, or a failure.
    async fn fetch_prices(
        &self,
        fund: &Fund,
        positions: &HashMap<String, RunningPosition>,
        date: NaiveDate,
    ) -> FundPricing {
        let start = date - Duration::days(TRADING_DAY_LOOKBACK_DAYS);
        let end = date.succ_opt().unwrap_or(date);

        let mut tickers: Vec<String> = positions.keys().cloned().collect();
        tickers.sort();

        let mut prices: HashMap<String, Decimal> = HashMap::new();
        let mut failed: Vec<String> = Vec::new();

        for chunk in tickers.chunks(PRICE_FETCH_BATCH_SIZE) {
            let fetches: Vec<_> = chunk
                .iter()
                .map(|ticker| {
                    let source = Arc::clone(&self.price_source);
                    let ticker = ticker.clone();
                    async move {
                        let outcome = source.fetch_close_prices(&ticker, start, end).await;
                        (ticker, outcome)
                    }
                })
                .collect();

            for (ticker, outcome) in futures::future::join_all(fetches).await {
                match outcome {
                    Ok(series) if !series.is_empty() => {
                        if let Some(point) = series.close_on_or_before(date) {
                            prices.insert(ticker, point.close);
                        } else {
                            self.price_from_cache(fund, &ticker, date, &mut prices, &mut failed);
                        }
                    }
                    Ok(_) => {
                        debug!("No price data for {} in fund {} on {}", ticker, fund.id, date);
                        self.price_from_cache(fund, &ticker, date, &mut prices, &mut failed);
                    }
                    Err(e) => {
                        warn!(
                            "Price fetch failed for {} in fund {} on {}: {}",
                            ticker, fund.id, date, e
                        );
                        self.price_from_cache(fund, &ticker, date, &mut prices, &mut failed);
                    }
                }
            }
        }

        FundPricing { prices, failed }
    }

    /// Falls back to the most recent stored close before `date`.
    fn price_from_cache(
        &self,
        fund: &Fund,
        ticker: &str,
        date: NaiveDate,
        prices: &mut HashMap<String, Decimal>,
        failed: &mut Vec<String>,
    ) {
        match self.snapshots.latest_close_price(&fund.id, ticker, date) {
            Ok(Some(price)) => {
                debug!("Using cached prior close for {} in fund {}", ticker, fund.id);
                prices.insert(ticker.to_string(), price);
            }
            Ok(None) => failed.push(ticker.to_string()),
            Err(e) => {
                warn!("Cached price lookup failed for {}: {}", ticker, e);
                failed.push(ticker.to_string());
            }
        }
    }

    fn build_rows(
        &self,
        fund: &Fund,
        positions: &HashMap<String, RunningPosition>,
        prices: &HashMap<String, Decimal>,
        trades: &[Trade],
        date: NaiveDate,
        report: &mut SyncReport,
    ) -> Result<Vec<PositionSnapshot>> {
        let actions = day_actions(trades, date, fund.timezone());
        let mut rates: HashMap<String, RateLookup> = HashMap::new();
        let mut rows = Vec::with_capacity(prices.len());

        for (ticker, position) in positions {
            let Some(price) = prices.get(ticker) else {
                continue;
            };

            let currency = normalize_currency_code(&position.currency);
            let lookup = match rates.get(&currency) {
                Some(lookup) => *lookup,
                None => {
                    let lookup = self.rate_for(fund, &currency, date)?;
                    rates.insert(currency.clone(), lookup);
                    lookup
                }
            };
            if lookup.is_fallback() {
                report.fallback_rates_used += 1;
            }

            let action = actions.get(ticker).copied().unwrap_or(SnapshotAction::Hold);
            rows.push(PositionSnapshot::from_position(
                fund,
                position,
                date,
                *price,
                lookup.rate(),
                action,
            ));
        }

        Ok(rows)
    }

    fn rate_for(&self, fund: &Fund, currency: &str, date: NaiveDate) -> Result<RateLookup> {
        let base = normalize_currency_code(&fund.base_currency);
        if currency == base {
            return Ok(RateLookup::Found(Decimal::ONE));
        }
        match self.fx.get_rate(date, currency, &base)? {
            Some(rate) => Ok(RateLookup::Found(rate)),
            None => {
                let fallback = Decimal::from_str(FALLBACK_EXCHANGE_RATE)
                    .map_err(|e| Error::Unexpected(e.to_string()))?;
                warn!(
                    "No {}->{} rate for {}. Using fallback rate {} for fund {}.",
                    currency, base, date, fallback, fund.id
                );
                Ok(RateLookup::Fallback(fallback))
            }
        }
    }

    /// Atomic day replace: batched delete of the existing rows, then an
    /// idempotent upsert keyed on (fund, ticker, day). The upsert is the
    /// safety net if a concurrent run's delete was only partially visible.
    async fn replace_day(
        &self,
        fund: &Fund,
        date: NaiveDate,
        rows: &[PositionSnapshot],
    ) -> Result<()> {
        let removed = self.snapshots.delete_day(&fund.id, date).await?;
        debug!(
            "Replaced {} existing rows with {} for fund {} on {}",
            removed,
            rows.len(),
            fund.id,
            date
        );
        self.snapshots.upsert_rows(rows).await
    }

    /// Resolves the trading day a dateless run should target: today once the
    /// market has opened (live intraday pricing), otherwise the most recent
    /// prior trading day, walking back at most seven calendar days.
    pub fn resolve_target_date(&self, now: DateTime<Utc>) -> Result<NaiveDate> {
        let local = now.with_timezone(&MARKET_TZ);
        let minutes = local.time().hour() * 60 + local.time().minute();
        let today = local.date_naive();

        let mut candidate = if minutes >= MARKET_OPEN_MINUTES {
            today
        } else {
            today.pred_opt().unwrap_or(today)
        };

        for _ in 0..=TRADING_DAY_LOOKBACK_DAYS {
            if self.calendar.is_trading_day(candidate, Market::Any) {
                return Ok(candidate);
            }
            match candidate.pred_opt() {
                Some(prev) => candidate = prev,
                None => break,
            }
        }

        Err(CalculatorError::NoTradingDayFound {
            date: today,
            lookback_days: TRADING_DAY_LOOKBACK_DAYS,
        }
        .into())
    }
}

/// Last trade action per ticker for trades that fall on `date` in the
/// fund's trading timezone. Tickers without a trade that day are HOLDs.
pub(crate) fn day_actions(
    trades: &[Trade],
    date: NaiveDate,
    tz: Tz,
) -> HashMap<String, SnapshotAction> {
    let mut actions = HashMap::new();
    for trade in trades {
        if time_utils::trading_date_from_utc(trade.trade_date, tz) == date {
            let action = match trade.classify() {
                TradeAction::Buy => SnapshotAction::Buy,
                TradeAction::Sell => SnapshotAction::Sell,
            };
            actions.insert(trade.ticker.clone(), action);
        }
    }
    actions
}
