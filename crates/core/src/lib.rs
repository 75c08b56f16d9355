pub mod domain;
pub mod error;
pub mod ingest;
pub mod report;
pub mod time;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_LICHESS_API_URL: &str = "https://lichess.org/api";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_RETRIES: u32 = 1;
    pub const DEFAULT_TOP_PLAYERS_COUNT: usize = 50;
    /// Upper bound on leaderboard size for the export and the names route.
    pub const MAX_TOP_PLAYERS: usize = 50;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub lichess_api_url: String,
        pub lichess_token: Option<String>,
        pub request_timeout_secs: u64,
        pub request_retries: u32,
        pub top_players_count: usize,
        pub sentry_dsn: Option<String>,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                lichess_api_url: DEFAULT_LICHESS_API_URL.to_string(),
                lichess_token: None,
                request_timeout_secs: DEFAULT_TIMEOUT_SECS,
                request_retries: DEFAULT_RETRIES,
                top_players_count: DEFAULT_TOP_PLAYERS_COUNT,
                sentry_dsn: None,
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let defaults = Self::default();
            let settings = Self {
                lichess_api_url: non_empty_var("LICHESS_API_URL")
                    .unwrap_or(defaults.lichess_api_url),
                lichess_token: non_empty_var("LICHESS_TOKEN"),
                request_timeout_secs: parse_var("LICHESS_TIMEOUT_SECS")?
                    .unwrap_or(defaults.request_timeout_secs),
                request_retries: parse_var("LICHESS_RETRIES")?
                    .unwrap_or(defaults.request_retries),
                top_players_count: parse_var("TOP_PLAYERS_COUNT")?
                    .unwrap_or(defaults.top_players_count),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
            };
            settings.validate()?;
            Ok(settings)
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(
                (1..=MAX_TOP_PLAYERS).contains(&self.top_players_count),
                "TOP_PLAYERS_COUNT must be 1..={MAX_TOP_PLAYERS} (got {})",
                self.top_players_count
            );
            anyhow::ensure!(
                self.request_timeout_secs > 0,
                "LICHESS_TIMEOUT_SECS must be positive"
            );
            Ok(())
        }
    }

    // Empty values count as unset so `LICHESS_TOKEN=` in a .env file disables auth.
    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        non_empty_var(key)
            .map(|s| s.parse::<T>().with_context(|| format!("{key} is invalid: {s}")))
            .transpose()
    }

}
