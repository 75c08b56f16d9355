use anyhow::Context;
use chrono::NaiveDate;
use rating_board_core::config::MAX_TOP_PLAYERS;
use rating_board_core::domain::RatingSeriesBuilder;
use rating_board_core::ingest::RatingDataSource;
use rating_board_core::report::{self, CsvExport};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub today: NaiveDate,
    pub count: usize,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
}

/// Writes the leaderboard CSV. Returns `None` on a dry run.
pub async fn run_csv_export(
    source: &dyn RatingDataSource,
    opts: &ExportOptions,
) -> anyhow::Result<Option<CsvExport>> {
    anyhow::ensure!(
        (1..=MAX_TOP_PLAYERS).contains(&opts.count),
        "player count must be 1..={MAX_TOP_PLAYERS} (got {})",
        opts.count
    );

    if opts.dry_run {
        let names = report::top_player_names(source, opts.count).await?;
        tracing::info!(
            today = %opts.today,
            dry_run = true,
            players = names.len(),
            output = ?opts.output,
            "would export rating history csv"
        );
        return Ok(None);
    }

    let export = report::top_players_csv(source, opts.today, opts.count).await?;
    write_output(opts.output.as_deref(), &export.body)?;

    if !export.skipped.is_empty() {
        tracing::warn!(skipped = ?export.skipped, "players missing from export");
    }
    Ok(Some(export))
}

/// One player's series as pretty JSON.
pub async fn render_player_series(
    source: &dyn RatingDataSource,
    username: &str,
    today: NaiveDate,
) -> anyhow::Result<String> {
    let series = RatingSeriesBuilder::new(source)
        .build(username, today)
        .await
        .with_context(|| format!("rating series for {username}"))?;
    Ok(serde_json::to_string_pretty(&series)?)
}

pub fn write_output(path: Option<&Path>, body: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, body)
            .with_context(|| format!("write {} failed", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body.as_bytes()).context("write stdout failed")?;
            stdout.flush().context("flush stdout failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rating_board_core::ingest::StubDataSource;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn source() -> StubDataSource {
        StubDataSource::new()
            .with_top_players(["alice", "ghost"])
            .with_profile("alice", Some(1500))
            .with_classical_points("alice", &[[2024, 6, 15, 1450]])
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(name)
    }

    #[tokio::test]
    async fn writes_csv_to_file() {
        let path = temp_path("rating_board_worker_export.csv");
        let _ = std::fs::remove_file(&path);

        let opts = ExportOptions {
            today: today(),
            count: 50,
            output: Some(path.clone()),
            dry_run: false,
        };
        let export = run_csv_export(&source(), &opts).await.unwrap().unwrap();
        assert_eq!(export.written, 1);
        assert_eq!(export.skipped, ["ghost"]);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, export.body);
        assert_eq!(content.lines().count(), 2);

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let path = temp_path("rating_board_worker_dry_run.csv");
        let _ = std::fs::remove_file(&path);

        let opts = ExportOptions {
            today: today(),
            count: 50,
            output: Some(path.clone()),
            dry_run: true,
        };
        assert!(run_csv_export(&source(), &opts).await.unwrap().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn rejects_zero_count() {
        let opts = ExportOptions {
            today: today(),
            count: 0,
            output: None,
            dry_run: true,
        };
        assert!(run_csv_export(&source(), &opts).await.is_err());
    }

    #[tokio::test]
    async fn rejects_count_above_cap() {
        let opts = ExportOptions {
            today: today(),
            count: MAX_TOP_PLAYERS + 1,
            output: None,
            dry_run: true,
        };
        let err = run_csv_export(&source(), &opts).await.unwrap_err();
        assert!(err.to_string().contains("1..=50"), "{err}");
    }

    #[tokio::test]
    async fn renders_single_player_json() {
        let json = render_player_series(&source(), "alice", today()).await.unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["username"], "alice");
        assert_eq!(v["ratings"].as_array().unwrap().len(), 30);
        assert_eq!(v["ratings"][29], 1450);
    }
}
