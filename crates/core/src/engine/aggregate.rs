use crate::domain::recommendation::AGGREGATE_AGENT_ID;
use crate::domain::{AgentKind, AgentRecommendation, CouncilPick, Horizon, StockSnapshot};
use crate::engine::config::HorizonWeights;
use crate::engine::scorers;
use crate::engine::target::{round_to, TargetModel};
use crate::ingest::PriceTarget;

const CONSENSUS_THRESHOLD: f64 = 0.6;
const MAX_TAGS: usize = 2;

/// Scores one stock with every agent and folds the results into a council pick.
pub fn aggregate(
    stock: &StockSnapshot,
    horizon: Horizon,
    weights: &HorizonWeights,
    lookup: Option<&PriceTarget>,
) -> CouncilPick {
    let recs = scorers::score_all(stock, horizon);

    let score: f64 = AgentKind::ALL
        .iter()
        .zip(&recs)
        .map(|(agent, rec)| rec.score * weights.weight(*agent))
        .sum();
    let confidence = recs.iter().map(|r| r.confidence).sum::<f64>() / recs.len() as f64;
    let consensus_count = recs
        .iter()
        .filter(|r| r.score > CONSENSUS_THRESHOLD)
        .count();

    let mut tags = ordered_union(recs.iter().flat_map(|r| r.tags.iter()));
    tags.truncate(MAX_TAGS);
    let risk_flags = ordered_union(recs.iter().flat_map(|r| r.risk_flags.iter()));
    let why = recs
        .iter()
        .map(|r| r.why.first().cloned().unwrap_or_default())
        .collect();

    let projection = TargetModel::from(horizon).project(stock, lookup);

    CouncilPick {
        recommendation: AgentRecommendation {
            agent_id: AGGREGATE_AGENT_ID.to_string(),
            symbol: stock.symbol.clone(),
            score,
            confidence: confidence.round(),
            tags,
            why,
            risk_flags,
        },
        consensus_count,
        target_price: round_to(projection.target_price, 2),
        projected_return: round_to(projection.projected_return_pct(stock.price), 1),
        prediction_methodology: projection.methodology.to_string(),
    }
}

fn ordered_union<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
