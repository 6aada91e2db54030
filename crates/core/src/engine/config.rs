use crate::domain::{AgentKind, Horizon};
use anyhow::ensure;
use std::collections::HashMap;

pub const OTHER_CLUSTER: &str = "Other";

pub const DEFAULT_UNIVERSE: [&str; 12] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "V", "JPM", "AVGO", "COST", "LLY",
];

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Per-agent weights for one horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonWeights {
    pub momentum: f64,
    pub value: f64,
    pub quality: f64,
}

impl HorizonWeights {
    pub fn weight(&self, agent: AgentKind) -> f64 {
        match agent {
            AgentKind::Momentum => self.momentum,
            AgentKind::Value => self.value,
            AgentKind::Quality => self.quality,
        }
    }

    pub fn sum(&self) -> f64 {
        self.momentum + self.value + self.quality
    }
}

/// Horizon -> agent weights. Each row sums to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    intraday: HorizonWeights,
    one_year: HorizonWeights,
    three_year: HorizonWeights,
}

impl WeightTable {
    pub fn new(
        intraday: HorizonWeights,
        one_year: HorizonWeights,
        three_year: HorizonWeights,
    ) -> anyhow::Result<Self> {
        let table = Self {
            intraday,
            one_year,
            three_year,
        };
        for horizon in Horizon::ALL {
            let row = table.for_horizon(horizon);
            ensure!(
                [row.momentum, row.value, row.quality]
                    .iter()
                    .all(|w| w.is_finite() && *w >= 0.0),
                "weights for {horizon} must be finite and non-negative"
            );
            ensure!(
                (row.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
                "weights for {horizon} must sum to 1.0 (got {})",
                row.sum()
            );
        }
        Ok(table)
    }

    pub fn for_horizon(&self, horizon: Horizon) -> &HorizonWeights {
        match horizon {
            Horizon::Intraday => &self.intraday,
            Horizon::OneYear => &self.one_year,
            Horizon::ThreeYear => &self.three_year,
        }
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            intraday: HorizonWeights {
                momentum: 0.70,
                value: 0.10,
                quality: 0.20,
            },
            one_year: HorizonWeights {
                momentum: 0.35,
                value: 0.30,
                quality: 0.35,
            },
            three_year: HorizonWeights {
                momentum: 0.10,
                value: 0.50,
                quality: 0.40,
            },
        }
    }
}

/// Named groups of related symbols, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorClusters {
    clusters: Vec<(String, Vec<String>)>,
}

impl SectorClusters {
    pub fn new<N, S>(clusters: impl IntoIterator<Item = (N, Vec<S>)>) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        Self {
            clusters: clusters
                .into_iter()
                .map(|(name, symbols)| (name.into(), symbols.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Symbol -> cluster lookup. First declared cluster wins for a symbol listed twice.
    pub fn index(&self) -> ClusterIndex {
        let mut by_symbol = HashMap::new();
        for (name, symbols) in &self.clusters {
            for symbol in symbols {
                by_symbol
                    .entry(symbol.clone())
                    .or_insert_with(|| name.clone());
            }
        }
        ClusterIndex { by_symbol }
    }
}

impl Default for SectorClusters {
    fn default() -> Self {
        Self::new([
            ("Big Tech", vec!["AAPL", "MSFT", "GOOGL", "META", "NVDA", "AVGO"]),
            ("Consumer/Retail", vec!["AMZN", "COST"]),
            ("Financials", vec!["V", "JPM"]),
            ("Healthcare", vec!["LLY"]),
            ("Automotive", vec!["TSLA"]),
        ])
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterIndex {
    by_symbol: HashMap<String, String>,
}

impl ClusterIndex {
    pub fn cluster_of(&self, symbol: &str) -> &str {
        self.by_symbol
            .get(symbol)
            .map(String::as_str)
            .unwrap_or(OTHER_CLUSTER)
    }
}

/// Static tables for a council run, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    pub weights: WeightTable,
    pub clusters: ClusterIndex,
}

impl CouncilConfig {
    pub fn new(weights: WeightTable, clusters: &SectorClusters) -> Self {
        Self {
            weights,
            clusters: clusters.index(),
        }
    }
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self::new(WeightTable::default(), &SectorClusters::default())
    }
}
