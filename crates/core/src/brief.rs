//! Daily brief: council decision plus narrative, and the per-day cache callers keep.

use crate::domain::contract::Narrative;
use crate::domain::{BriefSource, DailyBrief, Horizon, StockSnapshot};
use crate::engine::Council;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{BriefNarrator, NarrativeInput};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;

pub const RECESS_SUMMARY: &str = "The Council is currently in recess. Algorithmic defaults applied.";

pub async fn generate_daily_brief(
    council: &Council,
    narrator: Option<&dyn BriefNarrator>,
    snapshots: &[StockSnapshot],
    horizon: Horizon,
    as_of: DateTime<Utc>,
) -> anyhow::Result<DailyBrief> {
    let outcome = council.run(snapshots, horizon).await?;

    let narrative = match narrator {
        Some(narrator) => {
            let input = NarrativeInput::new(horizon, &outcome.buy, &outcome.sell_or_avoid, snapshots);
            match narrator.narrate(&input).await {
                Ok(n) => Some(n),
                Err(err) => {
                    if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                        tracing::debug!(
                            stage = diag.stage,
                            detail = %diag.detail,
                            raw_output = diag.raw_output.as_deref().unwrap_or_default(),
                            "narrator diagnostics"
                        );
                    }
                    tracing::warn!(
                        %horizon,
                        provider = ?narrator.provider(),
                        error = %format!("{err:#}"),
                        "narrative generation failed; using algorithmic defaults"
                    );
                    None
                }
            }
        }
        None => None,
    };
    let Narrative {
        debate,
        chief_summary,
    } = narrative.unwrap_or_else(|| Narrative {
        debate: Vec::new(),
        chief_summary: RECESS_SUMMARY.to_string(),
    });

    let sources = news_sources(
        snapshots,
        outcome.buy.iter().map(|p| p.symbol()),
    );

    Ok(DailyBrief {
        as_of,
        horizon,
        buy: outcome.buy,
        sell_or_avoid: outcome.sell_or_avoid,
        debate,
        sources,
        chief_summary,
    })
}

/// Recent headlines for the given symbols, in pick order, de-duplicated by URL.
fn news_sources<'a>(snapshots: &[StockSnapshot], symbols: impl Iterator<Item = &'a str>) -> Vec<BriefSource> {
    let mut out: Vec<BriefSource> = Vec::new();
    for symbol in symbols {
        let Some(stock) = snapshots.iter().find(|s| s.symbol == symbol) else {
            continue;
        };
        for item in &stock.news {
            if item.url.is_empty() || out.iter().any(|s| s.uri == item.url) {
                continue;
            }
            out.push(BriefSource {
                title: item.headline.clone(),
                uri: item.url.clone(),
            });
        }
    }
    out
}

/// One brief per (calendar day, horizon), held in memory.
#[derive(Debug, Default)]
pub struct BriefCache {
    entries: tokio::sync::Mutex<HashMap<(NaiveDate, Horizon), Arc<DailyBrief>>>,
}

impl BriefCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, date: NaiveDate, horizon: Horizon) -> Option<Arc<DailyBrief>> {
        self.entries.lock().await.get(&(date, horizon)).cloned()
    }

    /// Stores `brief` and drops entries from earlier days.
    pub async fn insert(&self, date: NaiveDate, brief: DailyBrief) -> Arc<DailyBrief> {
        let brief = Arc::new(brief);
        let mut guard = self.entries.lock().await;
        guard.retain(|(d, _), _| *d >= date);
        guard.insert((date, brief.horizon), Arc::clone(&brief));
        brief
    }

    pub async fn invalidate(&self, date: NaiveDate, horizon: Horizon) {
        self.entries.lock().await.remove(&(date, horizon));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::snapshot::NewsItem;
    use crate::domain::DebateMessage;
    use crate::engine::CouncilConfig;
    use crate::ingest::NoPriceTargets;
    use crate::llm::Provider;
    use chrono::TimeZone;

    struct FixedNarrator {
        fail: bool,
    }

    #[async_trait::async_trait]
    impl BriefNarrator for FixedNarrator {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn narrate(&self, input: &NarrativeInput) -> anyhow::Result<Narrative> {
            if self.fail {
                anyhow::bail!("model overloaded");
            }
            Ok(Narrative {
                debate: vec![DebateMessage {
                    agent_id: "momentum_v1".to_string(),
                    text: format!("{} picks", input.picks.len()),
                    timestamp: "09:30".to_string(),
                }],
                chief_summary: "Quality leads. Stay patient.".to_string(),
            })
        }
    }

    fn council() -> Council {
        Council::new(CouncilConfig::default(), Arc::new(NoPriceTargets))
    }

    fn universe() -> Vec<StockSnapshot> {
        let mut aapl = StockSnapshot::new("AAPL", 190.0);
        aapl.fundamentals.roe_ttm = 0.4;
        aapl.news = vec![
            NewsItem {
                headline: "Apple ships".to_string(),
                source: "Wire".to_string(),
                url: "https://news.example/apple".to_string(),
                published_at: "2026-01-05T10:00:00+00:00".to_string(),
            },
            NewsItem {
                headline: "Apple ships (dup)".to_string(),
                source: "Wire".to_string(),
                url: "https://news.example/apple".to_string(),
                published_at: "2026-01-05T11:00:00+00:00".to_string(),
            },
        ];
        let tsla = StockSnapshot::new("TSLA", 170.0);
        vec![aapl, tsla]
    }

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 21, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn brief_includes_narrative_and_news_sources() {
        let narrator = FixedNarrator { fail: false };
        let brief = generate_daily_brief(&council(), Some(&narrator), &universe(), Horizon::OneYear, as_of())
            .await
            .unwrap();

        assert_eq!(brief.buy.len(), 2);
        assert_eq!(brief.debate.len(), 1);
        assert_eq!(brief.debate[0].text, "2 picks");
        assert_eq!(brief.chief_summary, "Quality leads. Stay patient.");
        assert_eq!(
            brief.sources,
            vec![BriefSource {
                title: "Apple ships".to_string(),
                uri: "https://news.example/apple".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn narrator_failure_falls_back_to_recess() {
        let narrator = FixedNarrator { fail: true };
        let brief = generate_daily_brief(&council(), Some(&narrator), &universe(), Horizon::Intraday, as_of())
            .await
            .unwrap();
        assert!(brief.debate.is_empty());
        assert_eq!(brief.chief_summary, RECESS_SUMMARY);
        assert!(!brief.buy.is_empty());
    }

    #[tokio::test]
    async fn missing_narrator_uses_recess_summary() {
        let brief = generate_daily_brief(&council(), None, &universe(), Horizon::ThreeYear, as_of())
            .await
            .unwrap();
        assert_eq!(brief.chief_summary, RECESS_SUMMARY);
    }

    #[tokio::test]
    async fn empty_universe_is_an_error() {
        let res = generate_daily_brief(&council(), None, &[], Horizon::OneYear, as_of()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn cache_is_keyed_by_day_and_horizon() {
        let cache = BriefCache::new();
        let brief = generate_daily_brief(&council(), None, &universe(), Horizon::OneYear, as_of())
            .await
            .unwrap();
        let day = as_of().date_naive();

        cache.insert(day, brief).await;
        assert!(cache.get(day, Horizon::OneYear).await.is_some());
        assert!(cache.get(day, Horizon::Intraday).await.is_none());

        let next_day = day.succ_opt().unwrap();
        let brief = generate_daily_brief(&council(), None, &universe(), Horizon::Intraday, as_of())
            .await
            .unwrap();
        cache.insert(next_day, brief).await;
        assert!(cache.get(day, Horizon::OneYear).await.is_none());

        cache.invalidate(next_day, Horizon::Intraday).await;
        assert!(cache.get(next_day, Horizon::Intraday).await.is_none());
    }
}
