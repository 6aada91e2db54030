//! The council decision engine: score, aggregate, diversify, classify.

pub mod aggregate;
pub mod config;
pub mod diversify;
pub mod risk;
pub mod scorers;
pub mod target;

use crate::domain::contract::validate_universe;
use crate::domain::{CouncilOutcome, CouncilPick, Horizon, StockSnapshot};
use crate::ingest::{PriceTarget, PriceTargetSource};
use anyhow::Context;
use std::sync::Arc;
use tokio::task::JoinSet;

pub use config::CouncilConfig;

#[derive(Clone)]
pub struct Council {
    config: Arc<CouncilConfig>,
    targets: Arc<dyn PriceTargetSource>,
}

impl Council {
    pub fn new(config: CouncilConfig, targets: Arc<dyn PriceTargetSource>) -> Self {
        Self {
            config: Arc::new(config),
            targets,
        }
    }

    /// Produces the buy list and the sell/avoid list for one horizon.
    ///
    /// Price-target lookups run concurrently, one per stock. A failed lookup degrades that
    /// stock to the algorithmic target; an invalid snapshot rejects the whole run.
    pub async fn run(&self, snapshots: &[StockSnapshot], horizon: Horizon) -> anyhow::Result<CouncilOutcome> {
        validate_universe(snapshots)?;

        let lookups = self.fetch_price_targets(snapshots).await?;
        let outcome = decide(&self.config, snapshots, horizon, &lookups);

        tracing::info!(
            %horizon,
            universe = snapshots.len(),
            buy = outcome.buy.len(),
            sell_or_avoid = outcome.sell_or_avoid.len(),
            "council run complete"
        );
        Ok(outcome)
    }

    /// One lookup per snapshot, returned in snapshot order.
    async fn fetch_price_targets(&self, snapshots: &[StockSnapshot]) -> anyhow::Result<Vec<Option<PriceTarget>>> {
        let mut tasks = JoinSet::new();
        for (idx, stock) in snapshots.iter().enumerate() {
            let targets = Arc::clone(&self.targets);
            let symbol = stock.symbol.clone();
            tasks.spawn(async move {
                let result = targets.fetch_price_target(&symbol).await;
                (idx, symbol, result)
            });
        }

        let mut lookups: Vec<Option<PriceTarget>> = vec![None; snapshots.len()];
        while let Some(joined) = tasks.join_next().await {
            let (idx, symbol, result) = joined.context("price target task failed")?;
            match result {
                Ok(target) => lookups[idx] = target,
                Err(err) => {
                    tracing::warn!(%symbol, error = %err, "price target lookup failed; using algorithmic target");
                }
            }
        }
        Ok(lookups)
    }
}

/// Pure decision step given already-resolved lookups (indexed like `snapshots`).
pub fn decide(
    config: &CouncilConfig,
    snapshots: &[StockSnapshot],
    horizon: Horizon,
    lookups: &[Option<PriceTarget>],
) -> CouncilOutcome {
    let weights = config.weights.for_horizon(horizon);

    let candidates: Vec<CouncilPick> = snapshots
        .iter()
        .enumerate()
        .map(|(idx, stock)| {
            let lookup = lookups.get(idx).and_then(Option::as_ref);
            aggregate::aggregate(stock, horizon, weights, lookup)
        })
        .collect();

    let buy = diversify::select_diversified(candidates, &config.clusters);
    let sell_or_avoid = risk::classify_remainder(snapshots, &buy, horizon);

    CouncilOutcome { buy, sell_or_avoid }
}

/// Convenience entry point over the default tables.
pub async fn run_council(
    snapshots: &[StockSnapshot],
    horizon: Horizon,
    targets: Arc<dyn PriceTargetSource>,
) -> anyhow::Result<CouncilOutcome> {
    Council::new(CouncilConfig::default(), targets)
        .run(snapshots, horizon)
        .await
}
