use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::QUANTITY_THRESHOLD;

/// Returns true when a share quantity is large enough to be treated as an
/// open position rather than floating residue from partial sells.
pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold =
        Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).unwrap_or_else(|_| Decimal::new(1, 8));
    quantity.abs() >= threshold
}

/// Running per-ticker holding state while replaying a fund's ledger.
///
/// This is ephemeral: it is rebuilt on demand from the trade ledger and never
/// persisted as the authority. Invariant: `shares >= 0` and `cost >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningPosition {
    pub ticker: String,
    pub shares: Decimal,
    /// Total cost basis of the open shares, in the position's currency.
    pub cost: Decimal,
    /// Set by the first acquisition; last write wins on later buys.
    pub currency: String,
}

impl RunningPosition {
    pub fn new(ticker: &str) -> Self {
        RunningPosition {
            ticker: ticker.to_string(),
            shares: Decimal::ZERO,
            cost: Decimal::ZERO,
            currency: String::new(),
        }
    }

    /// Average cost per share, zero when the position is empty.
    pub fn average_price(&self) -> Decimal {
        if self.shares.is_zero() || !is_quantity_significant(&self.shares) {
            Decimal::ZERO
        } else {
            self.cost / self.shares
        }
    }
}
