use crate::domain::brief::DebateMessage;
use crate::domain::snapshot::{Fundamentals, NewsItem, Returns, RiskIndicators, StockSnapshot, Trend};
use crate::domain::AgentKind;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Wire shape of a snapshot as supplied by callers. Only `symbol` and `price` are required;
/// everything else defaults to a neutral zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStockSnapshot {
    pub symbol: Option<String>,
    #[serde(default)]
    pub ts: Option<i64>,
    pub price: Option<f64>,
    #[serde(default)]
    pub change_pct: Option<f64>,
    #[serde(default)]
    pub returns: Option<Returns>,
    #[serde(default)]
    pub trend: Option<Trend>,
    #[serde(default)]
    pub risk: Option<RiskIndicators>,
    #[serde(default)]
    pub fundamentals: Option<Fundamentals>,
    #[serde(default)]
    pub news: Option<Vec<NewsItem>>,
}

impl RawStockSnapshot {
    pub fn validate_and_into_snapshot(self) -> anyhow::Result<StockSnapshot> {
        let symbol = self
            .symbol
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let Some(symbol) = symbol else {
            anyhow::bail!("snapshot symbol must be non-empty");
        };

        let Some(price) = self.price else {
            anyhow::bail!("snapshot {symbol} is missing price");
        };
        validate_price(&symbol, price)?;

        Ok(StockSnapshot {
            symbol,
            ts: self.ts.unwrap_or_default(),
            price,
            change_pct: finite_or_zero(self.change_pct.unwrap_or_default()),
            returns: self.returns.unwrap_or_default(),
            trend: self.trend.unwrap_or_default(),
            risk: self.risk.unwrap_or_default(),
            fundamentals: self.fundamentals.unwrap_or_default(),
            news: self.news.unwrap_or_default(),
        })
    }
}

/// Decodes a JSON array of raw snapshots and validates it as one universe.
pub fn parse_snapshots_json(text: &str) -> anyhow::Result<Vec<StockSnapshot>> {
    let raw: Vec<RawStockSnapshot> =
        serde_json::from_str(text).context("snapshots must be a JSON array of stock snapshots")?;

    let snapshots = raw
        .into_iter()
        .enumerate()
        .map(|(idx, r)| {
            r.validate_and_into_snapshot()
                .with_context(|| format!("invalid snapshot at index {idx}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    validate_universe(&snapshots)?;
    Ok(snapshots)
}

/// Rejects a universe that cannot be scored as a whole.
pub fn validate_universe(snapshots: &[StockSnapshot]) -> anyhow::Result<()> {
    ensure!(!snapshots.is_empty(), "universe must contain at least one snapshot");

    let mut seen = BTreeSet::<&str>::new();
    for s in snapshots {
        ensure!(!s.symbol.trim().is_empty(), "snapshot symbol must be non-empty");
        validate_price(&s.symbol, s.price)?;
        ensure!(seen.insert(s.symbol.as_str()), "duplicate symbol: {}", s.symbol);
    }
    Ok(())
}

/// Narrative as emitted by the language model, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmNarrative {
    #[serde(default)]
    pub debate: Vec<LlmDebateMessage>,
    #[serde(default)]
    pub chief_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmDebateMessage {
    pub agent_id: String,
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Validated narrative: known speakers, non-empty text, non-empty summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub debate: Vec<DebateMessage>,
    pub chief_summary: String,
}

pub const MAX_DEBATE_MESSAGES: usize = 8;

impl LlmNarrative {
    pub fn validate_and_into_narrative(self) -> anyhow::Result<Narrative> {
        let chief_summary = self
            .chief_summary
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        ensure!(!chief_summary.is_empty(), "chiefSummary must be non-empty");

        ensure!(!self.debate.is_empty(), "debate must contain at least one message");
        ensure!(
            self.debate.len() <= MAX_DEBATE_MESSAGES,
            "debate must contain at most {MAX_DEBATE_MESSAGES} messages (got {})",
            self.debate.len()
        );

        let mut debate = Vec::with_capacity(self.debate.len());
        for msg in self.debate {
            let agent_id = msg.agent_id.trim().to_string();
            ensure!(
                AgentKind::from_id(&agent_id).is_some(),
                "unknown debate speaker: {agent_id}"
            );
            let text = msg.text.trim().to_string();
            ensure!(!text.is_empty(), "debate text must be non-empty");

            debate.push(DebateMessage {
                agent_id,
                text,
                timestamp: msg
                    .timestamp
                    .map(|t| t.trim().to_string())
                    .unwrap_or_default(),
            });
        }

        Ok(Narrative {
            debate,
            chief_summary,
        })
    }
}

fn validate_price(symbol: &str, price: f64) -> anyhow::Result<()> {
    ensure!(
        price.is_finite() && price > 0.0,
        "snapshot {symbol} has invalid price: {price}"
    );
    Ok(())
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
