//! Finnhub wire shapes and their mapping onto domain snapshots.

use crate::domain::snapshot::{Fundamentals, NewsItem, Returns, RiskIndicators, StockSnapshot, Trend};
use crate::ingest::provider::PriceTarget;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const MAX_NEWS_ITEMS: usize = 3;

// Used when the provider reports no beta.
const DEFAULT_VOL20D: f64 = 0.015;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Quote {
    /// Current price.
    #[serde(default)]
    pub c: Option<f64>,
    /// Percent change on the day.
    #[serde(default)]
    pub dp: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricResponse {
    #[serde(default)]
    pub metric: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyNews {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    /// Unix seconds.
    #[serde(default)]
    pub datetime: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTargetResponse {
    #[serde(default)]
    pub target_mean: Option<f64>,
    #[serde(default)]
    pub target_high: Option<f64>,
}

impl PriceTargetResponse {
    pub fn into_price_target(self) -> Option<PriceTarget> {
        let target = PriceTarget {
            target_mean: self.target_mean.filter(|v| v.is_finite()),
            target_high: self.target_high.filter(|v| v.is_finite()),
        };
        (!target.is_empty()).then_some(target)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandleResponse {
    #[serde(default)]
    pub s: String,
    #[serde(default)]
    pub c: Vec<f64>,
    #[serde(default)]
    pub t: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    pub label: String,
    pub value: f64,
}

/// Chart window offered for price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleRange {
    OneMonth,
    SixMonths,
    OneYear,
    FiveYears,
}

impl CandleRange {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1M" => Ok(Self::OneMonth),
            "6M" => Ok(Self::SixMonths),
            "1Y" => Ok(Self::OneYear),
            "5Y" => Ok(Self::FiveYears),
            other => anyhow::bail!("unsupported candle range: {other}"),
        }
    }

    pub fn days(&self) -> i64 {
        match self {
            Self::OneMonth => 30,
            Self::SixMonths => 180,
            Self::OneYear => 365,
            Self::FiveYears => 1825,
        }
    }

    pub fn resolution(&self) -> &'static str {
        match self {
            Self::OneMonth | Self::SixMonths => "D",
            Self::OneYear => "W",
            Self::FiveYears => "M",
        }
    }
}

impl CandleResponse {
    pub fn into_points(self, days: i64) -> Option<Vec<CandlePoint>> {
        if self.s != "ok" || self.t.is_empty() {
            return None;
        }
        let fmt = if days > 365 { "%b %y" } else { "%b %-d" };
        let points = self
            .t
            .iter()
            .zip(self.c.iter())
            .filter_map(|(ts, close)| {
                let at = DateTime::<Utc>::from_timestamp(*ts, 0)?;
                Some(CandlePoint {
                    label: at.format(fmt).to_string(),
                    value: (close * 100.0).round() / 100.0,
                })
            })
            .collect();
        Some(points)
    }
}

/// Truthy numeric metric: present, finite and non-zero.
fn metric(metrics: &BTreeMap<String, Value>, key: &str) -> Option<f64> {
    metrics
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v != 0.0)
}

fn truthy(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x != 0.0)
}

/// Builds a snapshot from the three Finnhub payloads. `None` when the quote has no price.
pub fn snapshot_from_finnhub(
    symbol: &str,
    quote: &Quote,
    metrics: &MetricResponse,
    news: &[CompanyNews],
    ts_millis: i64,
) -> Option<StockSnapshot> {
    let price = truthy(quote.c).filter(|p| *p > 0.0)?;
    let m = &metrics.metric;
    let change_pct = truthy(quote.dp).unwrap_or(0.0);

    let ma50 = metric(m, "50DayMovingAverage");
    let high_52w = metric(m, "52WeekHigh");

    Some(StockSnapshot {
        symbol: symbol.to_string(),
        ts: ts_millis,
        price,
        change_pct,
        returns: Returns {
            one_day: change_pct,
            one_week: metric(m, "52WeekPriceReturnDaily").map(|r| r / 52.0).unwrap_or(0.0),
            one_month: metric(m, "1MonthPriceReturnDaily").unwrap_or(0.0),
            three_month: metric(m, "3MonthPriceReturnDaily").unwrap_or(0.0),
        },
        trend: Trend {
            ma20: metric(m, "20DayMovingAverage").unwrap_or(0.0),
            ma50: ma50.unwrap_or(0.0),
            above_ma50: ma50.map(|ma| price > ma).unwrap_or(false),
        },
        risk: RiskIndicators {
            vol20d: metric(m, "beta").map(|b| b / 100.0).unwrap_or(DEFAULT_VOL20D),
            max_drawdown_6m: high_52w.map(|h| -(h - price) / h).unwrap_or(0.0),
        },
        fundamentals: Fundamentals {
            pe_ttm: metric(m, "peBasicExclExtraTTM")
                .or_else(|| metric(m, "peExclExtraTTM"))
                .unwrap_or(0.0),
            roe_ttm: metric(m, "roeTTM").map(|v| v / 100.0).unwrap_or(0.0),
            debt_to_equity: metric(m, "totalDebt/totalEquityTTM")
                .map(|v| v / 100.0)
                .unwrap_or(0.0),
            revenue_growth_ttm: metric(m, "revenueGrowthTTM")
                .map(|v| v / 100.0)
                .unwrap_or(0.0),
        },
        news: news
            .iter()
            .take(MAX_NEWS_ITEMS)
            .map(|n| NewsItem {
                headline: n.headline.clone(),
                source: n.source.clone(),
                url: n.url.clone(),
                published_at: DateTime::<Utc>::from_timestamp(n.datetime, 0)
                    .map(|d| d.to_rfc3339())
                    .unwrap_or_default(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metrics(v: Value) -> MetricResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn maps_metrics_onto_snapshot() {
        let quote: Quote = serde_json::from_value(json!({"c": 200.0, "dp": 1.5, "h": 201.0})).unwrap();
        let m = metrics(json!({
            "metric": {
                "52WeekPriceReturnDaily": 26.0,
                "1MonthPriceReturnDaily": 3.0,
                "3MonthPriceReturnDaily": 9.0,
                "20DayMovingAverage": 195.0,
                "50DayMovingAverage": 190.0,
                "beta": 1.2,
                "52WeekHigh": 250.0,
                "peBasicExclExtraTTM": null,
                "peExclExtraTTM": 28.0,
                "roeTTM": 150.0,
                "totalDebt/totalEquityTTM": 180.0,
                "revenueGrowthTTM": 6.0
            }
        }));
        let news = vec![CompanyNews {
            headline: "h".into(),
            source: "s".into(),
            url: "u".into(),
            datetime: 1_700_000_000,
        }];

        let s = snapshot_from_finnhub("AAPL", &quote, &m, &news, 42).unwrap();
        assert_eq!(s.price, 200.0);
        assert_eq!(s.returns.one_day, 1.5);
        assert_eq!(s.returns.one_week, 0.5);
        assert_eq!(s.returns.three_month, 9.0);
        assert!(s.trend.above_ma50);
        assert!((s.risk.vol20d - 0.012).abs() < 1e-12);
        assert!((s.risk.max_drawdown_6m - -0.2).abs() < 1e-12);
        assert_eq!(s.fundamentals.pe_ttm, 28.0);
        assert_eq!(s.fundamentals.roe_ttm, 1.5);
        assert_eq!(s.fundamentals.debt_to_equity, 1.8);
        assert_eq!(s.news.len(), 1);
        assert!(s.news[0].published_at.starts_with("2023-11-14"));
    }

    #[test]
    fn missing_metrics_are_neutral() {
        let quote = Quote {
            c: Some(10.0),
            dp: None,
        };
        let s = snapshot_from_finnhub("V", &quote, &MetricResponse::default(), &[], 0).unwrap();
        assert_eq!(s.trend.ma50, 0.0);
        assert!(!s.trend.above_ma50);
        assert_eq!(s.risk.vol20d, DEFAULT_VOL20D);
        assert_eq!(s.risk.max_drawdown_6m, 0.0);
        assert_eq!(s.fundamentals.pe_ttm, 0.0);
    }

    #[test]
    fn quote_without_price_is_skipped() {
        let quote = Quote { c: Some(0.0), dp: None };
        assert!(snapshot_from_finnhub("X", &quote, &MetricResponse::default(), &[], 0).is_none());
        assert!(snapshot_from_finnhub("X", &Quote::default(), &MetricResponse::default(), &[], 0).is_none());
    }

    #[test]
    fn keeps_at_most_three_news_items() {
        let quote = Quote { c: Some(10.0), dp: None };
        let news: Vec<_> = (0..5)
            .map(|i| CompanyNews {
                headline: format!("h{i}"),
                source: "s".into(),
                url: "u".into(),
                datetime: 0,
            })
            .collect();
        let s = snapshot_from_finnhub("X", &quote, &MetricResponse::default(), &news, 0).unwrap();
        assert_eq!(s.news.len(), MAX_NEWS_ITEMS);
        assert_eq!(s.news[2].headline, "h2");
    }

    #[test]
    fn price_target_response_without_figures_is_none() {
        let empty: PriceTargetResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.into_price_target(), None);

        let full: PriceTargetResponse =
            serde_json::from_value(json!({"targetMean": 210.0, "targetHigh": 260.0, "symbol": "AAPL"}))
                .unwrap();
        assert_eq!(
            full.into_price_target(),
            Some(PriceTarget {
                target_mean: Some(210.0),
                target_high: Some(260.0),
            })
        );
    }

    #[test]
    fn candles_require_ok_status() {
        let bad: CandleResponse = serde_json::from_value(json!({"s": "no_data"})).unwrap();
        assert!(bad.into_points(30).is_none());

        let ok: CandleResponse = serde_json::from_value(json!({
            "s": "ok",
            "t": [1_700_000_000, 1_700_086_400],
            "c": [10.123, 11.0]
        }))
        .unwrap();
        let points = ok.into_points(30).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].value, 10.12);
        assert_eq!(points[0].label, "Nov 14");
    }

    #[test]
    fn candle_range_maps_to_days_and_resolution() {
        let r = CandleRange::parse("1y").unwrap();
        assert_eq!(r.days(), 365);
        assert_eq!(r.resolution(), "W");
        assert_eq!(CandleRange::parse("5Y").unwrap().resolution(), "M");
        assert!(CandleRange::parse("2W").is_err());
    }
}
