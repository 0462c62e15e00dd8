use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::Market;

/// A fund is an isolated portfolio namespace. Every ledger replay and
/// snapshot operation is scoped to exactly one fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    pub id: String,
    pub name: String,
    /// Reporting currency; non-base positions carry a converted copy of
    /// their valuation fields.
    pub base_currency: String,
    /// IANA timezone in which this fund's trading days are defined.
    pub trading_timezone: String,
    /// Which market calendar governs this fund's trading days.
    pub market: Market,
    /// Only production funds participate in scheduled sync runs.
    pub is_production: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fund {
    /// Parses the fund's configured trading timezone, falling back to
    /// America/New_York when the stored string is invalid.
    pub fn timezone(&self) -> Tz {
        self.trading_timezone.parse().unwrap_or_else(|_| {
            log::warn!(
                "Fund {} has invalid trading timezone '{}'. Falling back to America/New_York.",
                self.id,
                self.trading_timezone
            );
            chrono_tz::America::New_York
        })
    }
}
