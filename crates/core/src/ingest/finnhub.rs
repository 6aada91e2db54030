use crate::config::Settings;
use crate::domain::StockSnapshot;
use crate::ingest::cache::TtlCache;
use crate::ingest::provider::{MarketDataProvider, PriceTarget, PriceTargetSource};
use crate::ingest::types::{
    snapshot_from_finnhub, CandlePoint, CandleRange, CandleResponse, CompanyNews, MetricResponse,
    PriceTargetResponse, Quote,
};
use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_RETRIES: u32 = 3;
const MAX_RETRIES: u32 = 8;
const BASE_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_MS: u64 = 30_000;
const DEFAULT_BATCH_SIZE: usize = 3;
const DEFAULT_BATCH_DELAY_MS: u64 = 500;
const NEWS_LOOKBACK_DAYS: i64 = 7;

const SNAPSHOT_TTL: Duration = Duration::from_secs(60);
const PRICE_TARGET_TTL: Duration = Duration::from_secs(3600);
const CANDLE_TTL: Duration = Duration::from_secs(3600);

const TOKEN_HEADER: &str = "x-finnhub-token";

#[derive(Debug)]
pub struct FinnhubClient {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
    batch_size: usize,
    batch_delay: Duration,

    snapshots: TtlCache<StockSnapshot>,
    price_targets: TtlCache<Option<PriceTarget>>,
    candles: TtlCache<Option<Vec<CandlePoint>>>,
}

impl FinnhubClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_finnhub_api_key()?;
        let base_url = settings
            .finnhub_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = env_parse("FINNHUB_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
        let retries = env_parse("FINNHUB_RETRIES")
            .unwrap_or(DEFAULT_RETRIES)
            .clamp(1, MAX_RETRIES);
        let batch_size = env_parse("FINNHUB_BATCH_SIZE")
            .unwrap_or(DEFAULT_BATCH_SIZE)
            .max(1);
        let batch_delay_ms = env_parse("FINNHUB_BATCH_DELAY_MS").unwrap_or(DEFAULT_BATCH_DELAY_MS);

        let mut token =
            HeaderValue::from_str(api_key).context("FINNHUB_API_KEY is not a valid header value")?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build finnhub http client")?;

        Ok(Self {
            http,
            base_url,
            retries,
            batch_size,
            batch_delay: Duration::from_millis(batch_delay_ms),
            snapshots: TtlCache::new(SNAPSHOT_TTL),
            price_targets: TtlCache::new(PRICE_TARGET_TTL),
            candles: TtlCache::new(CANDLE_TTL),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let res = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("finnhub request failed: {path}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read finnhub response")?;
        if !status.is_success() {
            anyhow::bail!("finnhub HTTP {status} for {path}: {text}");
        }

        serde_json::from_str::<T>(&text)
            .with_context(|| format!("finnhub response for {path} is not the expected JSON: {text}"))
    }

    async fn get_json_with_retries<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_json(path, query).await {
                Ok(v) => return Ok(v),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = retry_backoff(attempt);
                    tracing::warn!(attempt, path, ?backoff, error = %err, "finnhub fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl PriceTargetSource for FinnhubClient {
    // Single attempt: a failure here falls back to the algorithmic target upstream.
    async fn fetch_price_target(&self, symbol: &str) -> Result<Option<PriceTarget>> {
        if let Some(cached) = self.price_targets.get(symbol).await {
            return Ok(cached);
        }

        let res: PriceTargetResponse = self
            .get_json("/stock/price-target", &[("symbol", symbol.to_string())])
            .await?;
        let target = res.into_price_target();
        self.price_targets.insert(symbol, target.clone()).await;
        Ok(target)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FinnhubClient {
    fn provider_name(&self) -> &'static str {
        "finnhub"
    }

    // Quote and metrics retry; news is best-effort.
    async fn fetch_snapshot(&self, symbol: &str) -> Result<Option<StockSnapshot>> {
        if let Some(cached) = self.snapshots.get(symbol).await {
            return Ok(Some(cached));
        }

        let symbol_q = [("symbol", symbol.to_string())];
        let metric_q = [("symbol", symbol.to_string()), ("metric", "all".to_string())];
        let today = Utc::now().date_naive();
        let from = today - chrono::Duration::days(NEWS_LOOKBACK_DAYS);
        let news_q = [
            ("symbol", symbol.to_string()),
            ("from", from.to_string()),
            ("to", today.to_string()),
        ];

        let (quote, metrics, news) = tokio::join!(
            self.get_json_with_retries::<Quote>("/quote", &symbol_q),
            self.get_json_with_retries::<MetricResponse>("/stock/metric", &metric_q),
            self.get_json::<Vec<CompanyNews>>("/company-news", &news_q),
        );
        let quote = quote?;
        let metrics = metrics?;
        let news = news.unwrap_or_else(|err| {
            tracing::debug!(%symbol, error = %err, "company news unavailable");
            Vec::new()
        });

        let snapshot = snapshot_from_finnhub(
            symbol,
            &quote,
            &metrics,
            &news,
            Utc::now().timestamp_millis(),
        );
        if let Some(s) = &snapshot {
            self.snapshots.insert(symbol, s.clone()).await;
        }
        Ok(snapshot)
    }

    async fn fetch_candles(&self, symbol: &str, range: CandleRange) -> Result<Option<Vec<CandlePoint>>> {
        let key = format!("{symbol}:{}:{}", range.resolution(), range.days());
        if let Some(cached) = self.candles.get(&key).await {
            return Ok(cached);
        }

        let to = Utc::now().timestamp();
        let from = to - range.days() * 24 * 60 * 60;
        let query = [
            ("symbol", symbol.to_string()),
            ("resolution", range.resolution().to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
        ];
        let res: CandleResponse = self.get_json("/stock/candle", &query).await?;
        let points = res.into_points(range.days());
        self.candles.insert(key, points.clone()).await;
        Ok(points)
    }

    async fn load_universe(&self, symbols: &[String]) -> Result<Vec<StockSnapshot>> {
        let mut out = Vec::with_capacity(symbols.len());
        let mut failures: usize = 0;

        for (batch_idx, batch) in symbols.chunks(self.batch_size).enumerate() {
            if batch_idx != 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            let results = join_all(batch.iter().map(|symbol| self.fetch_snapshot(symbol))).await;
            for (symbol, res) in batch.iter().zip(results) {
                match res {
                    Ok(Some(snapshot)) => out.push(snapshot),
                    Ok(None) => {
                        failures += 1;
                        tracing::warn!(%symbol, "no quote available; skipping stock");
                    }
                    Err(err) => {
                        failures += 1;
                        tracing::warn!(%symbol, error = %err, "snapshot fetch failed; skipping stock");
                    }
                }
            }
        }

        tracing::info!(
            requested = symbols.len(),
            loaded = out.len(),
            failures,
            "universe loaded"
        );
        Ok(out)
    }
}

/// Exponential backoff after the `attempt`-th failure, capped at `MAX_BACKOFF_MS`.
fn retry_backoff(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}
