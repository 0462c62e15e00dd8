use chrono::NaiveDate;
use chrono_tz::Tz;
use log::warn;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::positions_model::{is_quantity_significant, RunningPosition};
use crate::ledger::{Trade, TradeAction};

/// Currency strings that upstream feeds emit when the real currency is
/// unknown. Treated as missing and defaulted to USD.
const CURRENCY_SENTINELS: [&str; 3] = ["nan", "none", "null"];

const DEFAULT_CURRENCY: &str = "USD";

/// Rebuilds per-ticker holdings by replaying a fund's trade ledger.
///
/// Pure and deterministic: the same trade list replayed to the same cutoff
/// always yields the same holdings, which is what makes the ledger (not the
/// snapshot table) authoritative after a crash.
pub struct PositionBuilder;

impl PositionBuilder {
    /// Replays `trades` up to and including `cutoff` (a trading-timezone
    /// calendar date) into a map of running positions.
    ///
    /// Trades must be ordered by trade date ascending; insertion order breaks
    /// ties. Tickers whose shares end at zero are excluded from the result.
    pub fn build(
        trades: &[Trade],
        cutoff: NaiveDate,
        tz: Tz,
    ) -> HashMap<String, RunningPosition> {
        let mut positions: HashMap<String, RunningPosition> = HashMap::new();

        for trade in trades {
            if trade.trading_date(tz) > cutoff {
                continue;
            }

            let position = positions
                .entry(trade.ticker.clone())
                .or_insert_with(|| RunningPosition::new(&trade.ticker));

            match trade.classify() {
                TradeAction::Buy => Self::apply_buy(position, trade),
                TradeAction::Sell => Self::apply_sell(position, trade),
            }
        }

        positions.retain(|ticker, position| {
            if position.shares.is_zero() || !is_quantity_significant(&position.shares) {
                log::debug!("Excluding closed position {} from rebuild result", ticker);
                false
            } else {
                true
            }
        });

        positions
    }

    fn apply_buy(position: &mut RunningPosition, trade: &Trade) {
        position.shares += trade.quantity;
        position.cost += trade.quantity * trade.unit_price;
        position.currency = Self::normalize_trade_currency(trade);
    }

    /// Reduces the position proportionally. A SELL that exceeds tracked
    /// holdings is clamped to zero with a warning; this tolerates bad trade
    /// data rather than carrying a short position, and the warning is the
    /// audit trail for the data-quality gap.
    fn apply_sell(position: &mut RunningPosition, trade: &Trade) {
        if position.shares.is_zero() || !is_quantity_significant(&position.shares) {
            warn!(
                "Trade {}: SELL of {} {} in fund {} against empty position. Ignoring.",
                trade.id, trade.quantity, trade.ticker, trade.fund_id
            );
            return;
        }

        let average_cost = position.cost / position.shares;
        let mut shares_sold = trade.quantity;

        if shares_sold > position.shares {
            warn!(
                "Trade {}: SELL of {} {} exceeds tracked holdings of {} in fund {}. \
                 Clamping position to zero; verify upstream trade data.",
                trade.id, shares_sold, trade.ticker, position.shares, trade.fund_id
            );
            shares_sold = position.shares;
        }

        position.cost -= shares_sold * average_cost;
        position.shares -= shares_sold;

        if position.cost.is_sign_negative() {
            position.cost = Decimal::ZERO;
        }
        if position.shares.is_sign_negative() {
            position.shares = Decimal::ZERO;
        }
    }

    fn normalize_trade_currency(trade: &Trade) -> String {
        let trimmed = trade.currency.trim();
        if trimmed.is_empty() || CURRENCY_SENTINELS.contains(&trimmed.to_lowercase().as_str()) {
            warn!(
                "Trade {}: missing or sentinel currency '{}' for {} in fund {}. Defaulting to {}.",
                trade.id, trade.currency, trade.ticker, trade.fund_id, DEFAULT_CURRENCY
            );
            DEFAULT_CURRENCY.to_string()
        } else {
            trimmed.to_uppercase()
        }
    }
}
