pub mod brief;
pub mod domain;
pub mod engine;
pub mod ingest;
pub mod llm;
pub mod time;

pub mod config {
    use anyhow::Context;

    use crate::engine::config::DEFAULT_UNIVERSE;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub finnhub_api_key: Option<String>,
        pub finnhub_base_url: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub universe: Vec<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                finnhub_api_key: non_empty_var("FINNHUB_API_KEY"),
                finnhub_base_url: non_empty_var("FINNHUB_BASE_URL"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                universe: parse_universe(std::env::var("COUNCIL_UNIVERSE").ok().as_deref()),
            })
        }

        pub fn require_finnhub_api_key(&self) -> anyhow::Result<&str> {
            self.finnhub_api_key
                .as_deref()
                .context("FINNHUB_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|s| !s.trim().is_empty())
    }

    /// Comma-separated symbols, upper-cased and de-duplicated; the default universe when unset or empty.
    pub fn parse_universe(raw: Option<&str>) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for part in raw.unwrap_or_default().split(',') {
            let symbol = part.trim().to_ascii_uppercase();
            if !symbol.is_empty() && !out.contains(&symbol) {
                out.push(symbol);
            }
        }

        if out.is_empty() {
            DEFAULT_UNIVERSE.iter().map(|s| s.to_string()).collect()
        } else {
            out
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn universe_defaults_when_unset() {
            assert_eq!(parse_universe(None).len(), DEFAULT_UNIVERSE.len());
            assert_eq!(parse_universe(Some(" , ")).len(), DEFAULT_UNIVERSE.len());
        }

        #[test]
        fn universe_override_is_normalized() {
            assert_eq!(parse_universe(Some("aapl, MSFT ,aapl")), vec!["AAPL", "MSFT"]);
        }
    }
}
