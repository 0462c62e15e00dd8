use chrono::NaiveDate;
use chrono_tz::Tz;

use super::ledger_model::Trade;
use crate::errors::Result;

/// Trait defining the contract for ledger repository operations.
///
/// The ledger is read-only from the engine's perspective. Implementations
/// must return trades ordered by trade date ascending, with insertion order
/// (id) breaking ties.
pub trait LedgerRepositoryTrait: Send + Sync {
    fn trades_for_fund(&self, fund_id: &str) -> Result<Vec<Trade>>;

    /// Trading-timezone date of the fund's earliest trade, if any.
    fn earliest_trade_date(&self, fund_id: &str, tz: Tz) -> Result<Option<NaiveDate>>;
}
