use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// A timestamp attached to an incoming snapshot or trade event.
///
/// Events arrive either with an explicit offset (scheduler runs, broker
/// exports in UTC) or as a bare wall-clock time already expressed in the
/// fund's trading timezone (manual entry). The distinction matters: a zoned
/// instant must be converted before its calendar date is taken, while a local
/// time already carries the right date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventTime {
    /// An instant with a known offset; converted to the trading timezone
    /// before the day key is derived.
    Zoned(DateTime<FixedOffset>),
    /// A wall-clock time assumed to already be in the trading timezone.
    Local(NaiveDateTime),
}

impl EventTime {
    /// Derives the trading-day key for this event in the given timezone.
    ///
    /// This is the single source of truth for converting timestamps to
    /// snapshot dates. Truncating a UTC timestamp directly produces the
    /// wrong day for any evening event east of the UTC meridian's midnight,
    /// so every day key in the engine must come through here.
    pub fn trading_date(&self, tz: Tz) -> NaiveDate {
        match self {
            EventTime::Zoned(dt) => dt.with_timezone(&tz).date_naive(),
            EventTime::Local(dt) => dt.date(),
        }
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(dt: DateTime<Utc>) -> Self {
        EventTime::Zoned(dt.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for EventTime {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        EventTime::Zoned(dt)
    }
}

impl From<NaiveDateTime> for EventTime {
    fn from(dt: NaiveDateTime) -> Self {
        EventTime::Local(dt)
    }
}

/// Converts a UTC instant to a trading date in the given timezone.
pub fn trading_date_from_utc(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

pub fn get_days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        if let Some(next) = current.succ_opt() {
            current = next;
        } else {
            // Should not happen for typical date ranges
            break;
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::{New_York, Toronto};

    #[test]
    fn test_zoned_and_local_same_trading_day() {
        // 2023-11-15 23:30 in New York is 2023-11-16 04:30 UTC. Both forms
        // must resolve to the same trading date.
        let local: EventTime = NaiveDate::from_ymd_opt(2023, 11, 15)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap()
            .into();
        let utc: EventTime = Utc
            .with_ymd_and_hms(2023, 11, 16, 4, 30, 0)
            .unwrap()
            .into();

        let expected = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        assert_eq!(local.trading_date(New_York), expected);
        assert_eq!(utc.trading_date(New_York), expected);
    }

    #[test]
    fn test_utc_truncation_would_be_wrong() {
        // The UTC calendar date differs from the trading date for an evening
        // event; the conversion must pick the trading-timezone date.
        let utc = Utc.with_ymd_and_hms(2023, 11, 16, 2, 0, 0).unwrap();
        assert_eq!(utc.date_naive(), NaiveDate::from_ymd_opt(2023, 11, 16).unwrap());
        assert_eq!(
            trading_date_from_utc(utc, New_York),
            NaiveDate::from_ymd_opt(2023, 11, 15).unwrap()
        );
    }

    #[test]
    fn test_dates_across_dst_transition_stay_distinct() {
        // Spring-forward weekend 2024-03-09 -> 2024-03-11 (America/*).
        let before = Utc.with_ymd_and_hms(2024, 3, 9, 20, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 11, 20, 0, 0).unwrap();
        assert_ne!(
            trading_date_from_utc(before, Toronto),
            trading_date_from_utc(after, Toronto)
        );
    }

    #[test]
    fn test_get_days_between() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 2).unwrap();
        let days = get_days_between(start, end);
        assert_eq!(days.len(), 4);
        assert_eq!(days[0], start);
        assert_eq!(days[3], end);
        assert!(get_days_between(end, start).is_empty());
    }
}
