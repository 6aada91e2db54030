use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use council_core::brief::{generate_daily_brief, BriefCache};
use council_core::domain::{DailyBrief, Horizon, StockSnapshot};
use council_core::engine::{Council, CouncilConfig};
use council_core::ingest::finnhub::FinnhubClient;
use council_core::ingest::types::{CandlePoint, CandleRange};
use council_core::ingest::MarketDataProvider;
use council_core::llm::anthropic::AnthropicClient;
use council_core::llm::BriefNarrator;

const BRIEF_UNAVAILABLE: &str = "unable to produce a brief for this horizon";
const DEFAULT_CANDLE_RANGE: &str = "1M";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = council_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let market = match FinnhubClient::from_settings(&settings) {
        Ok(client) => {
            let client = Arc::new(client);
            let council = Council::new(CouncilConfig::default(), client.clone());
            Some(Market {
                data: client,
                council,
            })
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "market data unavailable; starting API in degraded mode");
            None
        }
    };

    let narrator: Option<Arc<dyn BriefNarrator>> = match AnthropicClient::from_settings(&settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            tracing::warn!(error = %e, "narrator unavailable; briefs will use algorithmic defaults");
            None
        }
    };

    let state = AppState {
        market: market.map(Arc::new),
        narrator,
        universe: Arc::new(settings.universe.clone()),
        briefs: Arc::new(BriefCache::new()),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/briefs/:horizon", get(get_brief))
        .route("/universe", get(get_universe))
        .route("/stocks/:symbol", get(get_stock))
        .route("/stocks/:symbol/candles", get(get_candles))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

struct Market {
    data: Arc<dyn MarketDataProvider>,
    council: Council,
}

#[derive(Clone)]
struct AppState {
    market: Option<Arc<Market>>,
    narrator: Option<Arc<dyn BriefNarrator>>,
    universe: Arc<Vec<String>>,
    briefs: Arc<BriefCache>,
}

type ApiError = (StatusCode, &'static str);

#[derive(Debug, Default, Deserialize)]
struct BriefQuery {
    #[serde(default)]
    refresh: bool,
}

async fn get_brief(
    State(state): State<AppState>,
    Path(horizon): Path<String>,
    Query(query): Query<BriefQuery>,
) -> Result<Json<DailyBrief>, ApiError> {
    let horizon: Horizon = horizon
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "unknown horizon"))?;
    let Some(market) = &state.market else {
        return Err((StatusCode::SERVICE_UNAVAILABLE, BRIEF_UNAVAILABLE));
    };

    let now = chrono::Utc::now();
    let today = now.date_naive();
    if query.refresh {
        state.briefs.invalidate(today, horizon).await;
    } else if let Some(brief) = state.briefs.get(today, horizon).await {
        return Ok(Json(DailyBrief::clone(&brief)));
    }

    let brief = async {
        let snapshots = market.data.load_universe(&state.universe).await?;
        generate_daily_brief(
            &market.council,
            state.narrator.as_deref(),
            &snapshots,
            horizon,
            now,
        )
        .await
    }
    .await
    .map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(%horizon, error = %format!("{e:#}"), "brief generation failed");
        (StatusCode::SERVICE_UNAVAILABLE, BRIEF_UNAVAILABLE)
    })?;

    let brief = state.briefs.insert(today, brief).await;
    Ok(Json(DailyBrief::clone(&brief)))
}

#[derive(Debug, Serialize)]
struct ApiUniverse {
    symbols: Vec<String>,
}

async fn get_universe(State(state): State<AppState>) -> Json<ApiUniverse> {
    Json(ApiUniverse {
        symbols: state.universe.to_vec(),
    })
}

async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockSnapshot>, ApiError> {
    let Some(market) = &state.market else {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "market data unavailable"));
    };

    let symbol = symbol.trim().to_ascii_uppercase();
    let snapshot = market
        .data
        .fetch_snapshot(&symbol)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(%symbol, error = %format!("{e:#}"), "snapshot fetch failed");
            (StatusCode::BAD_GATEWAY, "snapshot fetch failed")
        })?
        .ok_or((StatusCode::NOT_FOUND, "no quote for symbol"))?;

    Ok(Json(snapshot))
}

#[derive(Debug, Default, Deserialize)]
struct CandleQuery {
    range: Option<String>,
}

async fn get_candles(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<Vec<CandlePoint>>, ApiError> {
    let range = CandleRange::parse(query.range.as_deref().unwrap_or(DEFAULT_CANDLE_RANGE))
        .map_err(|_| (StatusCode::BAD_REQUEST, "unsupported range"))?;
    let Some(market) = &state.market else {
        return Err((StatusCode::SERVICE_UNAVAILABLE, "market data unavailable"));
    };

    let symbol = symbol.trim().to_ascii_uppercase();
    let points = market
        .data
        .fetch_candles(&symbol, range)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            (StatusCode::BAD_GATEWAY, "candle fetch failed")
        })?
        .ok_or((StatusCode::NOT_FOUND, "no price history"))?;

    Ok(Json(points))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &council_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
