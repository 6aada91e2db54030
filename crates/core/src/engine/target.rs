use crate::domain::{Horizon, StockSnapshot};
use crate::ingest::PriceTarget;

const DEFAULT_SIGMA: f64 = 0.02;
const ONE_YEAR_FALLBACK_MULTIPLIER: f64 = 1.12;
const THREE_YEAR_FALLBACK_MULTIPLIER: f64 = 1.35;

const SIGMA_RANGE_METHODOLOGY: &str = "Intraday Analysis: Target calculated using 20-day historical sigma volatility. It represents the upper expected range for the current trading session (Standard Deviation breakout).";
const ANALYST_MEAN_METHODOLOGY: &str = "Institutional Analysis: Sourced from Finnhub Aggregate Analyst Feed. Represents the arithmetic mean target from professional researchers (Institutional Consensus).";
const GROWTH_FALLBACK_METHODOLOGY: &str = "Algorithmic Analysis: Analyst data unavailable for this ticker. Target based on 12% revenue growth projection grounded in sectoral ROE averages.";
const ANALYST_HIGH_METHODOLOGY: &str = "Strategic Analysis: Long-term target derived from Finnhub Institutional 'High' Consensus. Assumes multi-year earnings expansion and potential valuation rerating.";
const COMPOUNDING_FALLBACK_METHODOLOGY: &str = "Strategic Analysis: Long-term compounding model. Assumes 35% cumulative return based on company's current Return on Equity (ROE) and earnings retention tapes.";

/// Horizon-specific target-price formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetModel {
    /// One-sigma expected session range.
    SigmaRange,
    /// Analyst mean target, else a 12% growth floor.
    AnalystMean,
    /// Analyst high target, else a 35% compounding projection.
    AnalystHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetBasis {
    Volatility,
    AnalystConsensus,
    AlgorithmicFallback,
}

/// Unrounded target; rounding happens when the pick is emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProjection {
    pub target_price: f64,
    pub basis: TargetBasis,
    pub methodology: &'static str,
}

impl From<Horizon> for TargetModel {
    fn from(horizon: Horizon) -> Self {
        match horizon {
            Horizon::Intraday => TargetModel::SigmaRange,
            Horizon::OneYear => TargetModel::AnalystMean,
            Horizon::ThreeYear => TargetModel::AnalystHigh,
        }
    }
}

impl TargetModel {
    pub fn project(&self, stock: &StockSnapshot, lookup: Option<&PriceTarget>) -> TargetProjection {
        let price = stock.price;
        match self {
            TargetModel::SigmaRange => {
                // Only a zero (absent) volatility takes the default; negative readings are kept.
                let sigma = Some(stock.risk.vol20d)
                    .filter(|v| v.is_finite() && *v != 0.0)
                    .unwrap_or(DEFAULT_SIGMA);
                TargetProjection {
                    target_price: price + price * sigma,
                    basis: TargetBasis::Volatility,
                    methodology: SIGMA_RANGE_METHODOLOGY,
                }
            }
            TargetModel::AnalystMean => match positive(lookup.and_then(|t| t.target_mean)) {
                Some(mean) => TargetProjection {
                    target_price: mean,
                    basis: TargetBasis::AnalystConsensus,
                    methodology: ANALYST_MEAN_METHODOLOGY,
                },
                None => TargetProjection {
                    target_price: price * ONE_YEAR_FALLBACK_MULTIPLIER,
                    basis: TargetBasis::AlgorithmicFallback,
                    methodology: GROWTH_FALLBACK_METHODOLOGY,
                },
            },
            TargetModel::AnalystHigh => match positive(lookup.and_then(|t| t.target_high)) {
                Some(high) => TargetProjection {
                    target_price: high,
                    basis: TargetBasis::AnalystConsensus,
                    methodology: ANALYST_HIGH_METHODOLOGY,
                },
                None => TargetProjection {
                    target_price: price * THREE_YEAR_FALLBACK_MULTIPLIER,
                    basis: TargetBasis::AlgorithmicFallback,
                    methodology: COMPOUNDING_FALLBACK_METHODOLOGY,
                },
            },
        }
    }
}

impl TargetProjection {
    /// Percent return from `price` to the target, unrounded.
    pub fn projected_return_pct(&self, price: f64) -> f64 {
        (self.target_price - price) / price * 100.0
    }
}

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x > 0.0)
}

pub fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}
