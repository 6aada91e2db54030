use serde::{Deserialize, Serialize};

/// Point-in-time view of one equity. Immutable input to a council run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub symbol: String,
    /// Unix millis at which the snapshot was assembled.
    #[serde(default)]
    pub ts: i64,
    pub price: f64,
    #[serde(default)]
    pub change_pct: f64,
    #[serde(default)]
    pub returns: Returns,
    #[serde(default)]
    pub trend: Trend,
    #[serde(default)]
    pub risk: RiskIndicators,
    #[serde(default)]
    pub fundamentals: Fundamentals,
    #[serde(default)]
    pub news: Vec<NewsItem>,
}

/// Percent returns keyed by lookback window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Returns {
    #[serde(rename = "1D", default)]
    pub one_day: f64,
    #[serde(rename = "1W", default)]
    pub one_week: f64,
    #[serde(rename = "1M", default)]
    pub one_month: f64,
    #[serde(rename = "3M", default)]
    pub three_month: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    #[serde(default)]
    pub ma20: f64,
    #[serde(default)]
    pub ma50: f64,
    #[serde(default)]
    pub above_ma50: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskIndicators {
    /// 20-day volatility as a fraction (0.02 = 2%).
    #[serde(default)]
    pub vol20d: f64,
    /// 6-month max drawdown, non-positive fraction.
    #[serde(default)]
    pub max_drawdown_6m: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    #[serde(default)]
    pub pe_ttm: f64,
    #[serde(default)]
    pub roe_ttm: f64,
    #[serde(default)]
    pub debt_to_equity: f64,
    #[serde(default)]
    pub revenue_growth_ttm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub source: String,
    pub url: String,
    pub published_at: String,
}

impl StockSnapshot {
    /// Minimal snapshot with only the required keys set.
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            ts: 0,
            price,
            change_pct: 0.0,
            returns: Returns::default(),
            trend: Trend::default(),
            risk: RiskIndicators::default(),
            fundamentals: Fundamentals::default(),
            news: Vec::new(),
        }
    }

    /// Price below a defined 50-day moving average.
    pub fn below_ma50(&self) -> bool {
        self.trend.ma50 > 0.0 && self.price < self.trend.ma50
    }
}
