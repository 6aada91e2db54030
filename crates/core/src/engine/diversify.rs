use crate::domain::CouncilPick;
use crate::engine::config::ClusterIndex;
use std::cmp::Ordering;
use std::collections::HashMap;

pub const MAX_PICKS: usize = 5;
pub const MAX_PER_CLUSTER: usize = 2;

/// Ranks candidates by weighted score (stable on ties) and admits at most
/// `MAX_PER_CLUSTER` per cluster until `MAX_PICKS` are chosen.
pub fn select_diversified(mut candidates: Vec<CouncilPick>, clusters: &ClusterIndex) -> Vec<CouncilPick> {
    // `sort_by` is stable, so equal scores keep input order.
    candidates.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal));

    let mut picks = Vec::with_capacity(MAX_PICKS);
    let mut per_cluster: HashMap<&str, usize> = HashMap::new();

    for cand in candidates {
        if picks.len() >= MAX_PICKS {
            break;
        }

        let cluster = clusters.cluster_of(cand.symbol());
        let admitted = per_cluster.entry(cluster).or_insert(0);
        if *admitted < MAX_PER_CLUSTER {
            *admitted += 1;
            tracing::debug!(symbol = %cand.symbol(), cluster, score = cand.score(), "admitted to buy list");
            picks.push(cand);
        }
    }

    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recommendation::AGGREGATE_AGENT_ID;
    use crate::domain::AgentRecommendation;
    use crate::engine::config::SectorClusters;

    fn pick(symbol: &str, score: f64) -> CouncilPick {
        CouncilPick {
            recommendation: AgentRecommendation {
                agent_id: AGGREGATE_AGENT_ID.to_string(),
                symbol: symbol.to_string(),
                score,
                confidence: 60.0,
                tags: vec![],
                why: vec![],
                risk_flags: vec![],
            },
            consensus_count: 0,
            target_price: 0.0,
            projected_return: 0.0,
            prediction_methodology: String::new(),
        }
    }

    fn symbols(picks: &[CouncilPick]) -> Vec<&str> {
        picks.iter().map(|p| p.symbol()).collect()
    }

    #[test]
    fn caps_each_cluster_at_two_and_backfills() {
        let index = SectorClusters::default().index();
        let cands = vec![
            pick("AAPL", 0.95),
            pick("MSFT", 0.94),
            pick("NVDA", 0.93),
            pick("META", 0.92),
            pick("JPM", 0.50),
            pick("V", 0.49),
            pick("AMZN", 0.48),
            pick("LLY", 0.10),
        ];

        let picks = select_diversified(cands, &index);
        assert_eq!(symbols(&picks), vec!["AAPL", "MSFT", "JPM", "V", "AMZN"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let index = SectorClusters::default().index();
        let cands = vec![pick("LLY", 0.7), pick("TSLA", 0.7), pick("COST", 0.9)];
        let picks = select_diversified(cands, &index);
        assert_eq!(symbols(&picks), vec!["COST", "LLY", "TSLA"]);

        let cands = vec![pick("TSLA", 0.7), pick("LLY", 0.7), pick("COST", 0.9)];
        let picks = select_diversified(cands, &index);
        assert_eq!(symbols(&picks), vec!["COST", "TSLA", "LLY"]);
    }

    #[test]
    fn unclustered_symbols_share_the_other_bucket() {
        let index = SectorClusters::default().index();
        let cands = vec![pick("XOM", 0.9), pick("CVX", 0.8), pick("PFE", 0.7), pick("AAPL", 0.1)];
        let picks = select_diversified(cands, &index);
        assert_eq!(symbols(&picks), vec!["XOM", "CVX", "AAPL"]);
    }

    #[test]
    fn never_exceeds_five_picks() {
        let index = SectorClusters::new([("Solo", vec!["Z"])]).index();
        let cands: Vec<_> = (0..12).map(|i| pick(&format!("S{i}"), 1.0 - i as f64 / 100.0)).collect();
        // All land in "Other", so only two are admitted.
        assert_eq!(select_diversified(cands, &index).len(), 2);

        let index = SectorClusters::new((0..12).map(|i| (format!("C{i}"), vec![format!("S{i}")])))
            .index();
        let cands: Vec<_> = (0..12).map(|i| pick(&format!("S{i}"), 0.5)).collect();
        let picks = select_diversified(cands, &index);
        assert_eq!(picks.len(), MAX_PICKS);
        assert_eq!(symbols(&picks), vec!["S0", "S1", "S2", "S3", "S4"]);
    }

    #[test]
    fn empty_input_yields_empty_list() {
        let index = SectorClusters::default().index();
        assert!(select_diversified(Vec::new(), &index).is_empty());
    }
}
