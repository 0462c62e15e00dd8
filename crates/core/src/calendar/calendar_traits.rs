use chrono::NaiveDate;

use super::calendar_model::Market;

/// Trading-day oracle, implemented outside this crate.
///
/// Holiday calendar computation is a separate concern; the engine only asks
/// whether a date is a trading day for a market and, for diagnostics, which
/// holiday closed it.
pub trait TradingCalendarTrait: Send + Sync {
    fn is_trading_day(&self, date: NaiveDate, market: Market) -> bool;
    fn holiday_name(&self, date: NaiveDate) -> Option<String>;
}
