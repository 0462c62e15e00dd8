use async_trait::async_trait;
use chrono::NaiveDate;

use super::market_data_errors::MarketDataError;
use super::market_data_model::PriceSeries;

/// Trait defining the contract for close-price providers.
///
/// Implemented outside this crate (HTTP clients against market data APIs).
/// An `Ok` series with no points signals "no data", distinct from a returned
/// error, which callers classify as rate-limited or transient.
#[async_trait]
pub trait PriceSourceTrait: Send + Sync {
    /// Close prices for `[start, end)`.
    async fn fetch_close_prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, MarketDataError>;
}
