use anyhow::Context;
use chrono::{NaiveTime, Utc};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use council_core::brief::generate_daily_brief;
use council_core::domain::contract::parse_snapshots_json;
use council_core::domain::{Horizon, StockSnapshot};
use council_core::engine::{Council, CouncilConfig};
use council_core::ingest::finnhub::FinnhubClient;
use council_core::ingest::{MarketDataProvider, NoPriceTargets, PriceTargetSource};
use council_core::llm::anthropic::AnthropicClient;
use council_core::llm::BriefNarrator;

#[derive(Debug, Parser)]
#[command(name = "council_worker")]
struct Args {
    /// Investment horizon: intraday, one_year or three_year (1d/1y/3y also accepted).
    #[arg(long, default_value = "one_year")]
    horizon: Horizon,

    /// Brief date (YYYY-MM-DD). Defaults to today's UTC date.
    #[arg(long)]
    as_of_date: Option<String>,

    /// Skip the narrator and emit the algorithmic summary.
    #[arg(long)]
    skip_narrative: bool,

    /// Comma-separated symbols overriding COUNCIL_UNIVERSE.
    #[arg(long)]
    symbols: Option<String>,

    /// JSON array of stock snapshots to score instead of fetching quotes.
    #[arg(long, conflicts_with = "symbols")]
    snapshots: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = council_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let now = Utc::now();
    let as_of_date = council_core::time::resolve_as_of_date(args.as_of_date.as_deref(), now)?;
    let as_of = if args.as_of_date.is_some() {
        as_of_date.and_time(NaiveTime::MIN).and_utc()
    } else {
        now
    };

    let symbols = match args.symbols.as_deref() {
        Some(raw) => council_core::config::parse_universe(Some(raw)),
        None => settings.universe.clone(),
    };

    let market = match FinnhubClient::from_settings(&settings) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) if args.snapshots.is_some() => {
            tracing::warn!(error = %e, "analyst targets unavailable; using algorithmic targets");
            None
        }
        Err(e) => return Err(e),
    };
    let targets: Arc<dyn PriceTargetSource> = match &market {
        Some(client) => client.clone(),
        None => Arc::new(NoPriceTargets),
    };
    let council = Council::new(CouncilConfig::default(), targets);

    let narrator: Option<AnthropicClient> = if args.skip_narrative {
        None
    } else {
        match AnthropicClient::from_settings(&settings) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "narrator unavailable; using algorithmic defaults");
                None
            }
        }
    };

    let source = match (&args.snapshots, &market) {
        (Some(_), _) => "file",
        (None, Some(client)) => client.provider_name(),
        (None, None) => "none",
    };
    tracing::info!(
        %as_of_date,
        horizon = %args.horizon,
        symbols = symbols.len(),
        source,
        "council run starting"
    );

    let result = async {
        let snapshots = match (&args.snapshots, &market) {
            (Some(path), _) => load_snapshot_file(path)?,
            (None, Some(client)) => client.load_universe(&symbols).await?,
            (None, None) => anyhow::bail!("no market data source configured"),
        };
        generate_daily_brief(
            &council,
            narrator.as_ref().map(|n| n as &dyn BriefNarrator),
            &snapshots,
            args.horizon,
            as_of,
        )
        .await
    }
    .await;

    match result {
        Ok(brief) => {
            let json = serde_json::to_string_pretty(&brief).context("failed to encode brief")?;
            println!("{json}");
            tracing::info!(
                %as_of_date,
                horizon = %args.horizon,
                buy = brief.buy.len(),
                sell_or_avoid = brief.sell_or_avoid.len(),
                "brief emitted"
            );
            Ok(())
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%as_of_date, horizon = %args.horizon, error = %format!("{err:#}"), "council run failed");
            Err(err)
        }
    }
}

fn load_snapshot_file(path: &Path) -> anyhow::Result<Vec<StockSnapshot>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshots from {}", path.display()))?;
    parse_snapshots_json(&text).with_context(|| format!("invalid snapshots in {}", path.display()))
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
