//! Shared trait mocks for the job tests.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::calendar::{Market, TradingCalendarTrait};
use crate::errors::Result;
use crate::funds::{Fund, FundRepositoryTrait};
use crate::fx::FxRateProviderTrait;
use crate::jobs::{JobExecution, JobStatus, JobTrackerTrait, RetryEntry, RetryQueueTrait};
use crate::ledger::{LedgerRepositoryTrait, Trade};
use crate::market_data::{MarketDataError, PricePoint, PriceSeries, PriceSourceTrait};
use crate::snapshot::{PositionSnapshot, SnapshotRepositoryTrait};

pub fn test_fund(id: &str, base_currency: &str) -> Fund {
    Fund {
        id: id.to_string(),
        name: format!("{} Fund", id),
        base_currency: base_currency.to_string(),
        trading_timezone: "America/New_York".to_string(),
        market: Market::Us,
        is_production: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn buy(id: &str, fund_id: &str, ticker: &str, qty: Decimal, price: Decimal, day: NaiveDate) -> Trade {
    Trade {
        id: id.to_string(),
        fund_id: fund_id.to_string(),
        ticker: ticker.to_string(),
        action: "BUY".to_string(),
        quantity: qty,
        unit_price: price,
        trade_date: Utc
            .with_ymd_and_hms(day.year(), day.month(), day.day(), 15, 0, 0)
            .unwrap(),
        cost_basis: qty * price,
        currency: "USD".to_string(),
        reason: String::new(),
    }
}

// --- Funds ---

pub struct MockFundRepository {
    pub funds: Vec<Fund>,
}

impl FundRepositoryTrait for MockFundRepository {
    fn get_by_id(&self, fund_id: &str) -> Result<Fund> {
        self.funds
            .iter()
            .find(|f| f.id == fund_id)
            .cloned()
            .ok_or_else(|| crate::Error::Repository(format!("Fund not found: {}", fund_id)))
    }

    fn list(&self) -> Result<Vec<Fund>> {
        Ok(self.funds.clone())
    }

    fn list_production_funds(&self) -> Result<Vec<Fund>> {
        Ok(self.funds.iter().filter(|f| f.is_production).cloned().collect())
    }
}

// --- Ledger ---

#[derive(Default)]
pub struct MockLedgerRepository {
    pub trades: HashMap<String, Vec<Trade>>,
}

impl LedgerRepositoryTrait for MockLedgerRepository {
    fn trades_for_fund(&self, fund_id: &str) -> Result<Vec<Trade>> {
        let mut trades = self.trades.get(fund_id).cloned().unwrap_or_default();
        trades.sort_by(|a, b| a.trade_date.cmp(&b.trade_date).then(a.id.cmp(&b.id)));
        Ok(trades)
    }

    fn earliest_trade_date(&self, fund_id: &str, tz: Tz) -> Result<Option<NaiveDate>> {
        Ok(self
            .trades_for_fund(fund_id)?
            .first()
            .map(|t| t.trading_date(tz)))
    }
}

// --- Snapshots ---

#[derive(Default)]
pub struct MockSnapshotStore {
    pub rows: Mutex<HashMap<String, PositionSnapshot>>,
    /// When true, every upsert fails (chunk failure simulation).
    pub fail_upserts: std::sync::atomic::AtomicBool,
}

impl MockSnapshotStore {
    pub fn all_rows(&self) -> Vec<PositionSnapshot> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn seed(&self, rows: Vec<PositionSnapshot>) {
        let mut guard = self.rows.lock().unwrap();
        for row in rows {
            guard.insert(row.id.clone(), row);
        }
    }
}

#[async_trait]
impl SnapshotRepositoryTrait for MockSnapshotStore {
    fn get_rows_for_day(&self, fund_id: &str, date: NaiveDate) -> Result<Vec<PositionSnapshot>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.fund_id == fund_id && r.snapshot_date == date)
            .cloned()
            .collect())
    }

    fn get_rows_in_range(
        &self,
        fund_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PositionSnapshot>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.fund_id == fund_id && r.snapshot_date >= start && r.snapshot_date <= end)
            .cloned()
            .collect())
    }

    async fn upsert_rows(&self, rows: &[PositionSnapshot]) -> Result<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(crate::Error::Repository("simulated insert failure".to_string()));
        }
        let mut guard = self.rows.lock().unwrap();
        for row in rows {
            guard.insert(row.id.clone(), row.clone());
        }
        Ok(())
    }

    async fn delete_day(&self, fund_id: &str, date: NaiveDate) -> Result<usize> {
        let mut guard = self.rows.lock().unwrap();
        let before = guard.len();
        guard.retain(|_, r| !(r.fund_id == fund_id && r.snapshot_date == date));
        Ok(before - guard.len())
    }

    fn count_rows_for_day(&self, fund_id: &str, date: NaiveDate) -> Result<i64> {
        Ok(self.get_rows_for_day(fund_id, date)?.len() as i64)
    }

    fn dates_with_rows(
        &self,
        fund_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashSet<NaiveDate>> {
        Ok(self
            .get_rows_in_range(fund_id, start, end)?
            .into_iter()
            .map(|r| r.snapshot_date)
            .collect())
    }

    fn latest_close_price(
        &self,
        fund_id: &str,
        ticker: &str,
        before: NaiveDate,
    ) -> Result<Option<Decimal>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.fund_id == fund_id && r.ticker == ticker && r.snapshot_date < before)
            .max_by_key(|r| r.snapshot_date)
            .map(|r| r.current_price))
    }
}

// --- Price source ---

#[derive(Default)]
pub struct MockPriceSource {
    pub series: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, MarketDataError>,
    pub fetch_count: AtomicUsize,
}

impl MockPriceSource {
    pub fn with_price(mut self, ticker: &str, date: NaiveDate, close: Decimal) -> Self {
        self.series
            .entry(ticker.to_string())
            .or_default()
            .push(PricePoint { date, close });
        self
    }

    pub fn with_error(mut self, ticker: &str, error: MarketDataError) -> Self {
        self.errors.insert(ticker.to_string(), error);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSourceTrait for MockPriceSource {
    async fn fetch_close_prices(
        &self,
        ticker: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> std::result::Result<PriceSeries, MarketDataError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.errors.get(ticker) {
            return Err(error.clone());
        }
        let points = self.series.get(ticker).cloned().unwrap_or_default();
        Ok(PriceSeries::new(ticker, points, "mock"))
    }
}

// --- FX ---

#[derive(Default)]
pub struct MockFxProvider {
    pub rates: HashMap<(NaiveDate, String, String), Decimal>,
}

impl MockFxProvider {
    pub fn with_rate(mut self, date: NaiveDate, from: &str, to: &str, rate: Decimal) -> Self {
        self.rates
            .insert((date, from.to_string(), to.to_string()), rate);
        self
    }
}

impl FxRateProviderTrait for MockFxProvider {
    fn get_rate(&self, date: NaiveDate, from: &str, to: &str) -> Result<Option<Decimal>> {
        Ok(self
            .rates
            .get(&(date, from.to_string(), to.to_string()))
            .copied())
    }
}

// --- Calendar ---

/// Weekdays are trading days unless listed as holidays.
#[derive(Default)]
pub struct WeekdayCalendar {
    pub holidays: HashMap<NaiveDate, String>,
}

impl WeekdayCalendar {
    pub fn with_holiday(mut self, date: NaiveDate, name: &str) -> Self {
        self.holidays.insert(date, name.to_string());
        self
    }
}

impl TradingCalendarTrait for WeekdayCalendar {
    fn is_trading_day(&self, date: NaiveDate, _market: Market) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
            && !self.holidays.contains_key(&date)
    }

    fn holiday_name(&self, date: NaiveDate) -> Option<String> {
        self.holidays.get(&date).cloned()
    }
}

// --- Job tracker ---

#[derive(Default)]
pub struct MockJobTracker {
    pub executions: Mutex<Vec<JobExecution>>,
}

impl MockJobTracker {
    pub fn executions_for(&self, job_name: &str) -> Vec<JobExecution> {
        self.executions
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.job_name == job_name)
            .cloned()
            .collect()
    }

    pub fn seed_running(&self, job_name: &str, target_date: NaiveDate, fund_name: &str, started_ago: Duration) -> String {
        let id = Uuid::new_v4().to_string();
        self.executions.lock().unwrap().push(JobExecution {
            id: id.clone(),
            job_name: job_name.to_string(),
            target_date,
            fund_name: fund_name.to_string(),
            status: JobStatus::Running,
            started_at: Utc::now() - started_ago,
            completed_at: None,
            duration_ms: None,
            error_message: None,
            funds_processed: Vec::new(),
        });
        id
    }
}

#[async_trait]
impl JobTrackerTrait for MockJobTracker {
    async fn start(
        &self,
        job_name: &str,
        target_date: NaiveDate,
        fund_name: Option<&str>,
    ) -> Result<JobExecution> {
        let execution = JobExecution {
            id: Uuid::new_v4().to_string(),
            job_name: job_name.to_string(),
            target_date,
            fund_name: fund_name.unwrap_or_default().to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            error_message: None,
            funds_processed: Vec::new(),
        };
        self.executions.lock().unwrap().push(execution.clone());
        Ok(execution)
    }

    async fn complete(&self, execution_id: &str, funds_processed: Vec<String>) -> Result<()> {
        let mut guard = self.executions.lock().unwrap();
        if let Some(execution) = guard.iter_mut().find(|e| e.id == execution_id) {
            execution.status = JobStatus::Success;
            execution.completed_at = Some(Utc::now());
            execution.funds_processed = funds_processed;
        }
        Ok(())
    }

    async fn fail(&self, execution_id: &str, error_message: &str) -> Result<()> {
        let mut guard = self.executions.lock().unwrap();
        if let Some(execution) = guard.iter_mut().find(|e| e.id == execution_id) {
            execution.status = JobStatus::Failed;
            execution.completed_at = Some(Utc::now());
            execution.error_message = Some(error_message.to_string());
        }
        Ok(())
    }

    async fn record_skipped(
        &self,
        job_name: &str,
        target_date: NaiveDate,
        fund_name: Option<&str>,
        reason: &str,
    ) -> Result<()> {
        self.executions.lock().unwrap().push(JobExecution {
            id: Uuid::new_v4().to_string(),
            job_name: job_name.to_string(),
            target_date,
            fund_name: fund_name.unwrap_or_default().to_string(),
            status: JobStatus::Failed,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            duration_ms: Some(0),
            error_message: Some(format!("skipped: {}", reason)),
            funds_processed: Vec::new(),
        });
        Ok(())
    }

    fn find_stale_running(&self, stale_after: Duration) -> Result<Vec<JobExecution>> {
        let cutoff = Utc::now() - stale_after;
        Ok(self
            .executions
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.status == JobStatus::Running && e.started_at < cutoff)
            .cloned()
            .collect())
    }
}

// --- Retry queue ---

#[derive(Default)]
pub struct MockRetryQueue {
    pub entries: Mutex<Vec<RetryEntry>>,
}

impl MockRetryQueue {
    pub fn entries(&self) -> Vec<RetryEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryQueueTrait for MockRetryQueue {
    async fn add(&self, entry: RetryEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}
