use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single dated closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Decimal,
}

/// Dated close-price series for one ticker, as returned by a price source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSeries {
    pub ticker: String,
    /// Sorted by date ascending.
    pub points: Vec<PricePoint>,
    pub source: String,
}

impl PriceSeries {
    pub fn new(ticker: &str, mut points: Vec<PricePoint>, source: &str) -> Self {
        points.sort_by_key(|p| p.date);
        PriceSeries {
            ticker: ticker.to_string(),
            points,
            source: source.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Close price for `date`, falling back to the most recent prior date.
    /// This is the lookup both sync and backfill use: markets publish no
    /// close on weekends/holidays, so a snapshot day may need Friday's price.
    pub fn close_on_or_before(&self, date: NaiveDate) -> Option<PricePoint> {
        self.points
            .iter()
            .rev()
            .find(|point| point.date <= date)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series() -> PriceSeries {
        PriceSeries::new(
            "AAPL",
            vec![
                PricePoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                    close: dec!(101),
                },
                PricePoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                    close: dec!(100),
                },
            ],
            "test",
        )
    }

    #[test]
    fn test_close_on_or_before_exact_match() {
        let point = series()
            .close_on_or_before(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
            .unwrap();
        assert_eq!(point.close, dec!(101));
    }

    #[test]
    fn test_close_on_or_before_prior_date_fallback() {
        // Jan 4 has no close; Jan 3 is the most recent prior.
        let point = series()
            .close_on_or_before(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap())
            .unwrap();
        assert_eq!(point.close, dec!(100));
    }

    #[test]
    fn test_close_on_or_before_none_before_series() {
        assert!(series()
            .close_on_or_before(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .is_none());
    }
}
