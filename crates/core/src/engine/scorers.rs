//! Signal scorers. Each maps one snapshot and horizon to a normalized recommendation.

use crate::domain::{AgentKind, AgentRecommendation, Horizon, StockSnapshot};

pub const MIN_CONFIDENCE: f64 = 20.0;
pub const MAX_CONFIDENCE: f64 = 95.0;

const HIGH_VOLATILITY: f64 = 0.03;
const LOW_VOLATILITY: f64 = 0.015;
const RETURN_SCALE: f64 = 15.0;

pub fn score_momentum(stock: &StockSnapshot, horizon: Horizon) -> AgentRecommendation {
    let returns = &stock.returns;
    let lookback = match horizon {
        Horizon::Intraday => returns.one_week * 0.7 + returns.one_day * 0.3,
        Horizon::OneYear | Horizon::ThreeYear => returns.three_month * 0.6 + returns.one_month * 0.4,
    };
    let high_vol = stock.risk.vol20d > HIGH_VOLATILITY;

    let mut score = lookback / RETURN_SCALE + 0.5;
    let mut confidence = 50.0 + if lookback > 0.0 { 20.0 } else { -10.0 };

    if stock.trend.above_ma50 {
        score += 0.2;
        confidence += 10.0;
    }
    if high_vol {
        score -= 0.3;
        confidence -= 15.0;
    }

    let tag = match horizon {
        Horizon::Intraday => "Velocity Play",
        _ => "Trend Leader",
    };
    let verdict = if lookback > 0.0 { "superior" } else { "lagging" };

    recommendation(
        AgentKind::Momentum,
        stock,
        score,
        confidence,
        tag,
        format!("Price performance over relevant horizon is {verdict}."),
        high_vol.then(|| "High Intraday Volatility".to_string()),
    )
}

pub fn score_value(stock: &StockSnapshot, horizon: Horizon) -> AgentRecommendation {
    let f = &stock.fundamentals;
    let mut score = 0.0;

    if f.pe_ttm < 15.0 {
        score += 0.5;
    } else if f.pe_ttm < 25.0 {
        score += 0.3;
    }
    if f.roe_ttm > 0.20 {
        score += 0.3;
    }
    if horizon == Horizon::ThreeYear && f.debt_to_equity < 0.8 {
        score += 0.2;
    }

    let cheap = f.pe_ttm < 20.0;
    let confidence = 65.0 + if cheap { 15.0 } else { 0.0 };
    let verdict = if cheap { "undervaluation" } else { "fair pricing" };

    recommendation(
        AgentKind::Value,
        stock,
        score,
        confidence,
        "Fundamental Value",
        format!("P/E of {:.1}x indicates {verdict}.", f.pe_ttm),
        (f.debt_to_equity > 1.5).then(|| "Elevated Debt Levels".to_string()),
    )
}

pub fn score_quality(stock: &StockSnapshot, horizon: Horizon) -> AgentRecommendation {
    let mut score = 0.0;

    if stock.fundamentals.roe_ttm > 0.25 {
        score += 0.5;
    }
    if stock.risk.max_drawdown_6m > -0.15 {
        score += 0.4;
    }
    // Short-term quality means stable daily moves.
    if horizon == Horizon::Intraday && stock.risk.vol20d < LOW_VOLATILITY {
        score += 0.1;
    }

    recommendation(
        AgentKind::Quality,
        stock,
        score,
        80.0,
        "Capital Efficiency",
        format!(
            "Return on Equity of {:.1}% shows high operational quality.",
            stock.fundamentals.roe_ttm * 100.0
        ),
        None,
    )
}

/// Runs all three scorers in fixed agent order.
pub fn score_all(stock: &StockSnapshot, horizon: Horizon) -> [AgentRecommendation; 3] {
    [
        score_momentum(stock, horizon),
        score_value(stock, horizon),
        score_quality(stock, horizon),
    ]
}

fn recommendation(
    agent: AgentKind,
    stock: &StockSnapshot,
    score: f64,
    confidence: f64,
    tag: &str,
    why: String,
    risk_flag: Option<String>,
) -> AgentRecommendation {
    AgentRecommendation {
        agent_id: agent.id().to_string(),
        symbol: stock.symbol.clone(),
        score: clamp_finite(score, 0.0, 1.0),
        confidence: clamp_finite(confidence, MIN_CONFIDENCE, MAX_CONFIDENCE),
        tags: vec![tag.to_string()],
        why: vec![why],
        risk_flags: risk_flag.into_iter().collect(),
    }
}

// NaN inputs collapse to the lower bound so that downstream ranking stays total.
fn clamp_finite(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock() -> StockSnapshot {
        StockSnapshot::new("TEST", 100.0)
    }

    #[test]
    fn momentum_clamps_at_upper_bound() {
        let mut s = stock();
        s.returns.three_month = 30.0;
        s.returns.one_month = 10.0;
        s.risk.vol20d = 0.01;
        s.trend.above_ma50 = true;

        let rec = score_momentum(&s, Horizon::OneYear);
        assert_eq!(rec.score, 1.0);
        assert_eq!(rec.confidence, 80.0);
        assert_eq!(rec.tags, vec!["Trend Leader"]);
        assert!(rec.risk_flags.is_empty());
        assert_eq!(rec.why, vec!["Price performance over relevant horizon is superior."]);
    }

    #[test]
    fn momentum_intraday_uses_short_lookback_and_flags_volatility() {
        let mut s = stock();
        s.returns.one_week = -3.0;
        s.returns.one_day = -1.0;
        s.returns.three_month = 50.0;
        s.risk.vol20d = 0.05;

        let rec = score_momentum(&s, Horizon::Intraday);
        // lookback = -2.4 -> -0.16 + 0.5 - 0.3
        assert!((rec.score - 0.04).abs() < 1e-12);
        // 50 - 10 - 15
        assert_eq!(rec.confidence, 25.0);
        assert_eq!(rec.tags, vec!["Velocity Play"]);
        assert_eq!(rec.risk_flags, vec!["High Intraday Volatility"]);
        assert_eq!(rec.agent_id, "momentum_v1");
    }

    #[test]
    fn momentum_neutral_stock_centers_at_half() {
        let rec = score_momentum(&stock(), Horizon::ThreeYear);
        assert_eq!(rec.score, 0.5);
        assert_eq!(rec.confidence, 40.0);
    }

    #[test]
    fn momentum_confidence_floor_is_twenty() {
        let mut s = stock();
        s.returns.three_month = -60.0;
        s.risk.vol20d = 0.2;
        let rec = score_momentum(&s, Horizon::OneYear);
        assert_eq!(rec.score, 0.0);
        assert_eq!(rec.confidence, 25.0);
        assert!(rec.confidence >= MIN_CONFIDENCE);
    }

    #[test]
    fn value_three_year_full_marks() {
        let mut s = stock();
        s.fundamentals.pe_ttm = 12.0;
        s.fundamentals.roe_ttm = 0.22;
        s.fundamentals.debt_to_equity = 0.5;

        let rec = score_value(&s, Horizon::ThreeYear);
        assert_eq!(rec.score, 1.0);
        assert_eq!(rec.confidence, 80.0);
        assert_eq!(rec.why, vec!["P/E of 12.0x indicates undervaluation."]);

        let one_year = score_value(&s, Horizon::OneYear);
        assert!((one_year.score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn value_mid_pe_and_debt_flag() {
        let mut s = stock();
        s.fundamentals.pe_ttm = 22.0;
        s.fundamentals.debt_to_equity = 2.0;

        let rec = score_value(&s, Horizon::ThreeYear);
        assert!((rec.score - 0.3).abs() < 1e-12);
        assert_eq!(rec.confidence, 65.0);
        assert_eq!(rec.risk_flags, vec!["Elevated Debt Levels"]);
        assert_eq!(rec.why, vec!["P/E of 22.0x indicates fair pricing."]);
    }

    #[test]
    fn value_missing_pe_counts_as_cheap() {
        // Absent fundamentals arrive as zero and are scored, not rejected.
        let rec = score_value(&stock(), Horizon::OneYear);
        assert_eq!(rec.score, 0.5);
        assert_eq!(rec.confidence, 80.0);
    }

    #[test]
    fn quality_intraday_bonus_only_for_low_vol() {
        let mut s = stock();
        s.fundamentals.roe_ttm = 0.30;
        s.risk.max_drawdown_6m = -0.05;
        s.risk.vol20d = 0.01;

        assert!((score_quality(&s, Horizon::Intraday).score - 1.0).abs() < 1e-12);
        assert!((score_quality(&s, Horizon::OneYear).score - 0.9).abs() < 1e-12);

        s.risk.max_drawdown_6m = -0.30;
        s.risk.vol20d = 0.02;
        let rec = score_quality(&s, Horizon::Intraday);
        assert_eq!(rec.score, 0.5);
        assert_eq!(rec.confidence, 80.0);
        assert!(rec.risk_flags.is_empty());
        assert_eq!(rec.why, vec!["Return on Equity of 30.0% shows high operational quality."]);
    }

    #[test]
    fn all_scores_and_confidences_stay_in_range() {
        let extremes = [-1.0e6, -50.0, -0.2, 0.0, 0.01, 0.3, 50.0, 1.0e6];
        for &x in &extremes {
            let mut s = stock();
            s.returns.one_day = x;
            s.returns.one_week = x;
            s.returns.one_month = x;
            s.returns.three_month = x;
            s.risk.vol20d = x.abs() / 100.0;
            s.risk.max_drawdown_6m = -x.abs();
            s.fundamentals.pe_ttm = x;
            s.fundamentals.roe_ttm = x;
            s.fundamentals.debt_to_equity = x;
            s.trend.above_ma50 = x > 0.0;

            for horizon in Horizon::ALL {
                for rec in score_all(&s, horizon) {
                    assert!((0.0..=1.0).contains(&rec.score), "{rec:?}");
                    assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&rec.confidence), "{rec:?}");
                }
            }
        }
    }
}
