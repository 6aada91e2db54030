use crate::domain::{ActionItem, CouncilPick, Horizon};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateMessage {
    pub agent_id: String,
    pub text: String,
    /// Wall-clock label, "HH:MM".
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefSource {
    pub title: String,
    pub uri: String,
}

/// Council output plus the narrative layered on top of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBrief {
    pub as_of: DateTime<Utc>,
    pub horizon: Horizon,
    pub buy: Vec<CouncilPick>,
    pub sell_or_avoid: Vec<ActionItem>,
    pub debate: Vec<DebateMessage>,
    pub sources: Vec<BriefSource>,
    pub chief_summary: String,
}
