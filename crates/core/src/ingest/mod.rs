pub mod cache;
pub mod finnhub;
pub mod provider;
pub mod types;

pub use provider::{MarketDataProvider, NoPriceTargets, PriceTarget, PriceTargetSource};
