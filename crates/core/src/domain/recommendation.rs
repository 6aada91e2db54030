use serde::{Deserialize, Serialize};

pub const AGGREGATE_AGENT_ID: &str = "council_aggregate";

/// The three independent signal scorers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    #[serde(rename = "momentum_v1")]
    Momentum,
    #[serde(rename = "value_v1")]
    Value,
    #[serde(rename = "quality_v1")]
    Quality,
}

impl AgentKind {
    /// Fixed agent order used for rationale triples and weighted sums.
    pub const ALL: [AgentKind; 3] = [AgentKind::Momentum, AgentKind::Value, AgentKind::Quality];

    pub fn id(&self) -> &'static str {
        match self {
            AgentKind::Momentum => "momentum_v1",
            AgentKind::Value => "value_v1",
            AgentKind::Quality => "quality_v1",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentKind::Momentum => "Momentum Max",
            AgentKind::Value => "Deep Value",
            AgentKind::Quality => "Guardian Quality",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::Momentum => "Focuses on price strength and trend persistence.",
            AgentKind::Value => "Looks for undervalued assets with strong fundamentals.",
            AgentKind::Quality => "Prioritizes low volatility and high profitability.",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }
}

/// Output of one scorer for one (stock, horizon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecommendation {
    pub agent_id: String,
    pub symbol: String,
    /// In [0, 1].
    pub score: f64,
    /// In [20, 95].
    pub confidence: f64,
    pub tags: Vec<String>,
    pub why: Vec<String>,
    pub risk_flags: Vec<String>,
}

/// Aggregated recommendation for a buy-list member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilPick {
    #[serde(flatten)]
    pub recommendation: AgentRecommendation,
    pub consensus_count: usize,
    pub target_price: f64,
    pub projected_return: f64,
    pub prediction_methodology: String,
}

impl CouncilPick {
    pub fn symbol(&self) -> &str {
        &self.recommendation.symbol
    }

    pub fn score(&self) -> f64 {
        self.recommendation.score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Sell,
    Avoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    Medium,
}

impl Action {
    pub fn priority(&self) -> Priority {
        match self {
            Action::Sell => Priority::High,
            Action::Avoid => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub symbol: String,
    pub action: Action,
    pub reason: String,
    pub priority: Priority,
}

/// Result of one council run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CouncilOutcome {
    pub buy: Vec<CouncilPick>,
    pub sell_or_avoid: Vec<ActionItem>,
}
