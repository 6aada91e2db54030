use crate::domain::StockSnapshot;
use crate::ingest::types::{CandlePoint, CandleRange};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Institutional consensus figures for one symbol. Absent fields mean "no data".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceTarget {
    pub target_mean: Option<f64>,
    pub target_high: Option<f64>,
}

impl PriceTarget {
    pub fn is_empty(&self) -> bool {
        self.target_mean.is_none() && self.target_high.is_none()
    }
}

/// Best-effort analyst consensus lookup. `Ok(None)` is the normal "no coverage" answer;
/// `Err` is a transport or parse failure that callers recover from locally.
#[async_trait::async_trait]
pub trait PriceTargetSource: Send + Sync {
    async fn fetch_price_target(&self, symbol: &str) -> Result<Option<PriceTarget>>;
}

/// Lookup used when no analyst feed is configured; every stock takes the algorithmic target.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPriceTargets;

#[async_trait::async_trait]
impl PriceTargetSource for NoPriceTargets {
    async fn fetch_price_target(&self, _symbol: &str) -> Result<Option<PriceTarget>> {
        Ok(None)
    }
}

/// Market data for council runs and the per-stock views.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// One snapshot. `Ok(None)` when the provider quotes no price for `symbol`.
    async fn fetch_snapshot(&self, symbol: &str) -> Result<Option<StockSnapshot>>;

    /// Closing prices for a chart window. `Ok(None)` when the provider has no data.
    async fn fetch_candles(&self, symbol: &str, range: CandleRange) -> Result<Option<Vec<CandlePoint>>>;

    /// Snapshots for a council run. Symbols without usable data are omitted.
    async fn load_universe(&self, symbols: &[String]) -> Result<Vec<StockSnapshot>>;
}
