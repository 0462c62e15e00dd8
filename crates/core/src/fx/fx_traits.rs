use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::Result;

/// Trait defining the contract for exchange rate lookups.
///
/// Implemented by the storage layer over persisted rates; the engine treats
/// rate sourcing itself as an external concern. `Ok(None)` means no rate is
/// known for the date, which callers handle via the counted fallback.
pub trait FxRateProviderTrait: Send + Sync {
    fn get_rate(
        &self,
        date: NaiveDate,
        from_currency: &str,
        to_currency: &str,
    ) -> Result<Option<Decimal>>;
}
