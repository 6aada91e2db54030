use crate::domain::{Action, ActionItem, CouncilPick, Horizon, StockSnapshot};
use std::collections::HashSet;

pub const MAX_ACTIONS: usize = 5;

const MIN_LONG_TERM_ROE: f64 = 0.08;
const AVOID_REASON: &str = "Relative weakness compared to top Council leaders.";

/// Labels stocks outside the buy list as SELL or AVOID, in snapshot order.
///
/// The list is cut at `MAX_ACTIONS` after classification, so a SELL that falls past the
/// fifth non-picked stock is dropped even if earlier entries are only AVOIDs.
pub fn classify_remainder(
    snapshots: &[StockSnapshot],
    picks: &[CouncilPick],
    horizon: Horizon,
) -> Vec<ActionItem> {
    let picked: HashSet<&str> = picks.iter().map(|p| p.symbol()).collect();

    snapshots
        .iter()
        .filter(|s| !picked.contains(s.symbol.as_str()))
        .map(|s| classify(s, horizon))
        .take(MAX_ACTIONS)
        .collect()
}

pub fn classify(stock: &StockSnapshot, horizon: Horizon) -> ActionItem {
    let sell_reason = match horizon {
        Horizon::Intraday => stock
            .below_ma50()
            .then_some("Price below 50-Day Moving Average; intraday trend is bearish."),
        Horizon::OneYear => stock
            .below_ma50()
            .then_some("Long-term trend proxy (MA50) broken; risk of further distribution."),
        Horizon::ThreeYear => (stock.fundamentals.roe_ttm < MIN_LONG_TERM_ROE)
            .then_some("Capital efficiency (ROE < 8%) is insufficient for long-term compounding."),
    };

    let (action, reason) = match sell_reason {
        Some(reason) => (Action::Sell, reason),
        None => (Action::Avoid, AVOID_REASON),
    };

    ActionItem {
        symbol: stock.symbol.clone(),
        action,
        reason: reason.to_string(),
        priority: action.priority(),
    }
}
