pub mod anthropic;
pub mod error;
pub mod json;

use crate::domain::contract::Narrative;
use crate::domain::{ActionItem, CouncilPick, Horizon, StockSnapshot};

/// What the narrator sees: the council's decision plus headline metrics per pick.
#[derive(Debug, Clone)]
pub struct NarrativeInput {
    pub horizon: Horizon,
    pub picks: Vec<PickMetrics>,
    pub actions: Vec<ActionItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickMetrics {
    pub symbol: String,
    pub pe_ttm: f64,
    pub roe_ttm: f64,
    pub return_3m: f64,
}

impl NarrativeInput {
    pub fn new(
        horizon: Horizon,
        picks: &[CouncilPick],
        actions: &[ActionItem],
        universe: &[StockSnapshot],
    ) -> Self {
        let picks = picks
            .iter()
            .filter_map(|p| universe.iter().find(|s| s.symbol == p.symbol()))
            .map(|s| PickMetrics {
                symbol: s.symbol.clone(),
                pe_ttm: s.fundamentals.pe_ttm,
                roe_ttm: s.fundamentals.roe_ttm,
                return_3m: s.returns.three_month,
            })
            .collect();

        Self {
            horizon,
            picks,
            actions: actions.to_vec(),
        }
    }

    pub fn metrics_lines(&self) -> String {
        self.picks
            .iter()
            .map(|p| {
                format!(
                    "{}: PE {:.1}, ROE {:.1}%, 3M Ret {:.1}%",
                    p.symbol,
                    p.pe_ttm,
                    p.roe_ttm * 100.0,
                    p.return_3m
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn actions_line(&self) -> String {
        self.actions
            .iter()
            .map(|a| format!("{} ({})", a.symbol, a.reason))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
}

#[async_trait::async_trait]
pub trait BriefNarrator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn narrate(&self, input: &NarrativeInput) -> anyhow::Result<Narrative>;
}
