use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, ValidationError};

/// Market calendar selector for trading-day checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Market {
    Us,
    Canadian,
    /// Open when at least one market is open.
    Any,
    /// Open only when both markets are open.
    Both,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Us => "US",
            Market::Canadian => "CANADIAN",
            Market::Any => "ANY",
            Market::Both => "BOTH",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Market {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "US" => Ok(Market::Us),
            "CANADIAN" => Ok(Market::Canadian),
            "ANY" => Ok(Market::Any),
            "BOTH" => Ok(Market::Both),
            other => Err(ValidationError::InvalidInput(format!("Unknown market: {}", other)).into()),
        }
    }
}
