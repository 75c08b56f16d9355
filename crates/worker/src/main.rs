use clap::Parser;
use rating_board_core::ingest::LichessClient;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod export;

#[derive(Debug, Parser)]
#[command(name = "rating_board_worker")]
struct Args {
    /// Last day of the window (YYYY-MM-DD). Defaults to today's UTC date.
    #[arg(long)]
    today: Option<String>,

    /// Number of leaderboard players to export. Defaults to TOP_PLAYERS_COUNT.
    #[arg(long)]
    count: Option<usize>,

    /// Write the CSV here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print this player's series as JSON instead of exporting the leaderboard.
    #[arg(long)]
    username: Option<String>,

    /// Fetch the leaderboard and log the plan without building series.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = rating_board_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // Logs go to stderr so stdout stays clean for the CSV.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let today = rating_board_core::time::resolve_today(args.today.as_deref(), chrono::Utc::now())?;
    let client = LichessClient::from_settings(&settings)?;

    if let Some(username) = args.username.as_deref() {
        let json = export::render_player_series(&client, username, today).await?;
        return export::write_output(args.output.as_deref(), &format!("{json}\n"));
    }

    let opts = export::ExportOptions {
        today,
        count: args.count.unwrap_or(settings.top_players_count),
        output: args.output,
        dry_run: args.dry_run,
    };

    match export::run_csv_export(&client, &opts).await {
        Ok(Some(export)) => {
            tracing::info!(
                %today,
                written = export.written,
                skipped = export.skipped.len(),
                "rating history export finished"
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%today, error = %err, "rating history export failed");
            Err(err)
        }
    }
}

fn init_sentry(settings: &rating_board_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
