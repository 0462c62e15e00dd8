//! Error types and failure classification for market data fetches.

use thiserror::Error;

/// Errors that can occur while fetching close prices.
///
/// The distinction between variants drives per-ticker recovery in the sync
/// jobs: `NoData` is a terminal answer for the range, `RateLimited` and
/// `Timeout` are transient, and `Provider` covers everything else.
#[derive(Error, Debug, Clone)]
pub enum MarketDataError {
    /// The ticker exists but has no quotes in the requested period.
    #[error("No data for date range")]
    NoData,

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited { provider: String },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout { provider: String },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },
}

impl MarketDataError {
    /// Classifies a raw provider failure message. HTTP 429 or rate-limit
    /// wording maps to `RateLimited`; anything else is a provider error.
    pub fn classify_fetch_failure(provider: &str, message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("429") || lowered.contains("rate limit") {
            MarketDataError::RateLimited {
                provider: provider.to_string(),
            }
        } else if lowered.contains("timed out") || lowered.contains("timeout") {
            MarketDataError::Timeout {
                provider: provider.to_string(),
            }
        } else {
            MarketDataError::Provider {
                provider: provider.to_string(),
                message: message.to_string(),
            }
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, MarketDataError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_fetch_failure() {
        assert!(MarketDataError::classify_fetch_failure("yahoo", "HTTP 429 Too Many Requests")
            .is_rate_limited());
        assert!(
            MarketDataError::classify_fetch_failure("yahoo", "Rate limit exceeded")
                .is_rate_limited()
        );
        assert!(matches!(
            MarketDataError::classify_fetch_failure("yahoo", "connection timed out"),
            MarketDataError::Timeout { .. }
        ));
        assert!(matches!(
            MarketDataError::classify_fetch_failure("yahoo", "boom"),
            MarketDataError::Provider { .. }
        ));
    }
}
