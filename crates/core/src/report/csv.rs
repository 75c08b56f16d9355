use crate::domain::rating::RatingSeries;
use crate::domain::series::RatingSeriesBuilder;
use crate::error::RatingError;
use crate::ingest::provider::RatingDataSource;
use crate::time::window::{window_dates, window_start, ISO_DATE};
use anyhow::Context;
use chrono::NaiveDate;

pub const CSV_FILENAME: &str = "top50_rating_history.csv";

#[derive(Debug, Clone)]
pub struct CsvExport {
    pub body: String,
    pub written: usize,
    pub skipped: Vec<String>,
}

/// One row per leaderboard player, `Username,<dates...>`, oldest date first.
///
/// Players whose series cannot be built are skipped and logged; only a failed
/// leaderboard fetch fails the export.
pub async fn top_players_csv(
    source: &dyn RatingDataSource,
    today: NaiveDate,
    count: usize,
) -> anyhow::Result<CsvExport> {
    let builder = RatingSeriesBuilder::new(source);
    let window = builder.window();
    window_start(today, window).ok_or(RatingError::WindowOutOfRange { today, window })?;

    let players = source
        .fetch_top_players(count)
        .await
        .map_err(|e| RatingError::LeaderboardUnavailable {
            reason: e.to_string(),
        })?;

    let total = players.len();

    let mut rows = Vec::with_capacity(total);
    let mut skipped = Vec::new();
    for (idx, player) in players.into_iter().enumerate() {
        match builder.build(&player.username, today).await {
            Ok(series) if series.len() == window => rows.push(series),
            Ok(series) => {
                tracing::warn!(
                    idx,
                    username = %player.username,
                    len = series.len(),
                    "incomplete rating series; skipping player"
                );
                skipped.push(player.username);
            }
            Err(err) => {
                tracing::warn!(
                    idx,
                    username = %player.username,
                    error = %err,
                    "rating series failed; skipping player"
                );
                skipped.push(player.username);
            }
        }
    }

    let body = write_series_csv(&window_dates(today, window), &rows)?;

    tracing::info!(
        %today,
        total,
        written = rows.len(),
        skipped = skipped.len(),
        "rating history csv generated"
    );

    Ok(CsvExport {
        body,
        written: rows.len(),
        skipped,
    })
}

pub fn write_series_csv(dates: &[NaiveDate], rows: &[RatingSeries]) -> anyhow::Result<String> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());

    let mut header = Vec::with_capacity(dates.len() + 1);
    header.push("Username".to_string());
    header.extend(dates.iter().map(|d| d.format(ISO_DATE).to_string()));
    writer
        .write_record(&header)
        .context("write csv header failed")?;

    for series in rows {
        let mut record = Vec::with_capacity(series.len() + 1);
        record.push(series.username.clone());
        record.extend(series.ratings.iter().map(i32::to_string));
        writer
            .write_record(&record)
            .with_context(|| format!("write csv row failed for {}", series.username))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flush csv writer failed: {}", e.error()))?;
    String::from_utf8(bytes).context("csv output is not valid UTF-8")
}
