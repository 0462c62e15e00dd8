use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::job_test_support::*;
use crate::constants::GAP_BACKFILL_JOB_NAME;
use crate::jobs::{GapBackfill, JobStatus};
use crate::positions::RunningPosition;
use crate::snapshot::{PositionSnapshot, SnapshotAction, SnapshotRepositoryTrait};

struct Fixture {
    backfill: GapBackfill,
    snapshots: Arc<MockSnapshotStore>,
    tracker: Arc<MockJobTracker>,
    retry_queue: Arc<MockRetryQueue>,
    price_source: Arc<MockPriceSource>,
    lock: Arc<Mutex<()>>,
}

fn fixture(
    trades: HashMap<String, Vec<crate::ledger::Trade>>,
    price_source: MockPriceSource,
    fx: MockFxProvider,
    calendar: WeekdayCalendar,
) -> Fixture {
    let snapshots = Arc::new(MockSnapshotStore::default());
    let tracker = Arc::new(MockJobTracker::default());
    let retry_queue = Arc::new(MockRetryQueue::default());
    let price_source = Arc::new(price_source);
    let lock = Arc::new(Mutex::new(()));
    let backfill = GapBackfill::new(
        Arc::new(MockLedgerRepository { trades }),
        snapshots.clone(),
        price_source.clone(),
        Arc::new(fx),
        Arc::new(calendar),
        tracker.clone(),
        retry_queue.clone(),
        lock.clone(),
    );
    Fixture {
        backfill,
        snapshots,
        tracker,
        retry_queue,
        price_source,
        lock,
    }
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn seeded_row(fund: &crate::funds::Fund, ticker: &str, day: NaiveDate) -> PositionSnapshot {
    let position = RunningPosition {
        ticker: ticker.to_string(),
        shares: dec!(10),
        cost: dec!(1000),
        currency: "USD".to_string(),
    };
    PositionSnapshot::from_position(fund, &position, day, dec!(100), dec!(1), SnapshotAction::Hold)
}

#[tokio::test]
async fn test_find_missing_days_skips_covered_weekends_and_holidays() {
    // Earliest trade Wednesday the 3rd; rows already exist for the 4th and
    // the 8th; the 10th is a holiday. Expected gaps: 3, 5, 9, 11, 12.
    let fund = test_fund("FUND1", "USD");
    let trades = HashMap::from([(
        "FUND1".to_string(),
        vec![buy("t1", "FUND1", "AAPL", dec!(10), dec!(100), jan(3))],
    )]);
    let f = fixture(
        trades,
        MockPriceSource::default(),
        MockFxProvider::default(),
        WeekdayCalendar::default().with_holiday(jan(10), "closure"),
    );
    f.snapshots.seed(vec![
        seeded_row(&fund, "AAPL", jan(4)),
        seeded_row(&fund, "AAPL", jan(8)),
    ]);

    let missing = f.backfill.find_missing_days(&fund, jan(1), jan(12)).unwrap();

    assert_eq!(missing, vec![jan(3), jan(5), jan(9), jan(11), jan(12)]);
}

#[tokio::test]
async fn test_find_missing_days_empty_without_trades() {
    let fund = test_fund("FUND1", "USD");
    let f = fixture(
        HashMap::new(),
        MockPriceSource::default(),
        MockFxProvider::default(),
        WeekdayCalendar::default(),
    );

    let missing = f.backfill.find_missing_days(&fund, jan(1), jan(12)).unwrap();

    assert!(missing.is_empty());
}

#[tokio::test]
async fn test_backfill_writes_one_row_per_missing_day() {
    // One ticker, trades start Wednesday the 3rd, range runs to Friday the
    // 5th: three missing trading days.
    let fund = test_fund("FUND1", "USD");
    let trades = HashMap::from([(
        "FUND1".to_string(),
        vec![buy("t1", "FUND1", "AAPL", dec!(10), dec!(100), jan(3))],
    )]);
    let f = fixture(
        trades,
        MockPriceSource::default().with_price("AAPL", jan(2), dec!(105)),
        MockFxProvider::default(),
        WeekdayCalendar::default(),
    );

    let report = f
        .backfill
        .backfill(&[fund.clone()], jan(1), jan(5))
        .await
        .unwrap();

    assert_eq!(report.missing_days_found, 3);
    assert_eq!(report.rows_written, 3);
    assert_eq!(report.days_confirmed, 3);
    assert_eq!(report.days_failed, 0);
    assert_eq!(report.funds_processed, vec!["FUND1 Fund".to_string()]);

    // The trade day carries its action; later days are holds, all priced
    // from the last available close.
    let trade_day = f.snapshots.get_rows_for_day("FUND1", jan(3)).unwrap();
    assert_eq!(trade_day.len(), 1);
    assert_eq!(trade_day[0].action, SnapshotAction::Buy);
    assert_eq!(trade_day[0].current_price, dec!(105));
    let later = f.snapshots.get_rows_for_day("FUND1", jan(5)).unwrap();
    assert_eq!(later[0].action, SnapshotAction::Hold);

    // Every touched day was confirmed by a tracked execution.
    let executions = f.tracker.executions_for(GAP_BACKFILL_JOB_NAME);
    assert_eq!(executions.len(), 3);
    assert!(executions.iter().all(|e| e.status == JobStatus::Success));
}

#[tokio::test]
async fn test_backfill_fetches_each_ticker_history_once() {
    let fund = test_fund("FUND1", "USD");
    let trades = HashMap::from([(
        "FUND1".to_string(),
        vec![
            buy("t1", "FUND1", "AAPL", dec!(10), dec!(100), jan(3)),
            buy("t2", "FUND1", "MSFT", dec!(5), dec!(300), jan(3)),
        ],
    )]);
    let f = fixture(
        trades,
        MockPriceSource::default()
            .with_price("AAPL", jan(2), dec!(105))
            .with_price("MSFT", jan(2), dec!(310)),
        MockFxProvider::default(),
        WeekdayCalendar::default(),
    );

    f.backfill.backfill(&[fund], jan(1), jan(12)).await.unwrap();

    // Eight missing trading days, two tickers: still exactly two fetches.
    assert_eq!(f.price_source.fetches(), 2);
}

#[tokio::test]
async fn test_chunk_failure_queues_retry_and_fails_readback() {
    let fund = test_fund("FUND1", "USD");
    let trades = HashMap::from([(
        "FUND1".to_string(),
        vec![buy("t1", "FUND1", "AAPL", dec!(10), dec!(100), jan(3))],
    )]);
    let f = fixture(
        trades,
        MockPriceSource::default().with_price("AAPL", jan(2), dec!(105)),
        MockFxProvider::default(),
        WeekdayCalendar::default(),
    );
    f.snapshots.fail_upserts.store(true, Ordering::SeqCst);

    let report = f.backfill.backfill(&[fund], jan(1), jan(5)).await.unwrap();

    assert_eq!(report.rows_written, 0);
    assert_eq!(report.chunks_failed, 1);
    assert_eq!(report.days_confirmed, 0);
    assert_eq!(report.days_failed, 3);

    let entries = f.retry_queue.entries();
    let chunk_entries: Vec<_> = entries.iter().filter(|e| e.entity_type == "chunk").collect();
    assert_eq!(chunk_entries.len(), 1);
    assert_eq!(chunk_entries[0].entity_id, "FUND1");
    assert_eq!(chunk_entries[0].context["firstDay"], "2024-01-03");
    let day_entries: Vec<_> = entries.iter().filter(|e| e.entity_type == "day").collect();
    assert_eq!(day_entries.len(), 3);

    let executions = f.tracker.executions_for(GAP_BACKFILL_JOB_NAME);
    assert!(executions.iter().all(|e| e.status == JobStatus::Failed));
}

#[tokio::test]
async fn test_backfill_skipped_when_lock_is_held() {
    let fund = test_fund("FUND1", "USD");
    let f = fixture(
        HashMap::new(),
        MockPriceSource::default(),
        MockFxProvider::default(),
        WeekdayCalendar::default(),
    );

    let _held = f.lock.lock().await;

    let report = f.backfill.backfill(&[fund], jan(1), jan(5)).await.unwrap();

    assert!(report.skipped);
    let executions = f.tracker.executions_for(GAP_BACKFILL_JOB_NAME);
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, JobStatus::Failed);
    assert!(executions[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("skipped"));
}

#[tokio::test]
async fn test_backfill_rejects_inverted_range() {
    let fund = test_fund("FUND1", "USD");
    let f = fixture(
        HashMap::new(),
        MockPriceSource::default(),
        MockFxProvider::default(),
        WeekdayCalendar::default(),
    );

    assert!(f.backfill.backfill(&[fund], jan(5), jan(1)).await.is_err());
}

#[tokio::test]
async fn test_backfill_counts_fallback_rates() {
    let fund = test_fund("FUND1", "CAD");
    let trades = HashMap::from([(
        "FUND1".to_string(),
        vec![buy("t1", "FUND1", "AAPL", dec!(10), dec!(100), jan(3))],
    )]);
    let f = fixture(
        trades,
        MockPriceSource::default().with_price("AAPL", jan(2), dec!(105)),
        MockFxProvider::default(),
        WeekdayCalendar::default(),
    );

    let report = f.backfill.backfill(&[fund], jan(3), jan(4)).await.unwrap();

    // Two days, one USD position each, no USD->CAD rate stored.
    assert_eq!(report.fallback_rates_used, 2);
    let rows = f.snapshots.all_rows();
    assert!(rows.iter().all(|r| r.exchange_rate == dec!(1.35)));
}
