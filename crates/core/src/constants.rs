/// Fund name sentinel for executions covering all funds.
pub const ALL_FUNDS_SENTINEL: &str = "";

/// Decimal precision for persisted valuation figures.
pub const DECIMAL_PRECISION: u32 = 6;

/// Share quantity threshold below which a position is treated as closed.
pub const QUANTITY_THRESHOLD: &str = "0.00000001";

/// Number of tickers priced concurrently against the market data provider.
/// Kept conservative to stay under free-tier rate limits.
pub const PRICE_FETCH_BATCH_SIZE: usize = 5;

/// Maximum number of snapshot rows written per insert request during backfill.
pub const SNAPSHOT_CHUNK_SIZE: usize = 200;

/// Maximum number of snapshot rows removed per delete statement.
pub const SNAPSHOT_DELETE_BATCH_SIZE: usize = 500;

/// How many calendar days to walk backwards when resolving the most recent
/// trading day for a sync run.
pub const TRADING_DAY_LOOKBACK_DAYS: i64 = 7;

/// Fallback CAD/USD-style exchange rate used when no rate exists for a date.
/// Every use is logged and counted separately from real lookups.
pub const FALLBACK_EXCHANGE_RATE: &str = "1.35";

/// Minutes past midnight (market timezone) at which the market opens.
/// 9:30 local time for both supported markets.
pub const MARKET_OPEN_MINUTES: u32 = 9 * 60 + 30;

/// A job execution still marked running after this many minutes is treated
/// as evidence of a crashed run.
pub const STALE_RUNNING_THRESHOLD_MINUTES: i64 = 120;

/// Job name for the single-date price synchronization job.
pub const PRICE_SYNC_JOB_NAME: &str = "price_sync";

/// Job name for the date-range gap backfill job.
pub const GAP_BACKFILL_JOB_NAME: &str = "gap_backfill";
