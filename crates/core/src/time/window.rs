use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

pub const DEFAULT_WINDOW_DAYS: usize = 30;

pub const ISO_DATE: &str = "%Y-%m-%d";

// Four-digit years only; chrono accepts signed and wider years that the
// upstream never reports.
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Explicit `YYYY-MM-DD` wins; otherwise the UTC calendar date of `now_utc`.
pub fn resolve_today(today_arg: Option<&str>, now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let today = match today_arg.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => NaiveDate::parse_from_str(s, ISO_DATE)?,
        None => now_utc.date_naive(),
    };

    anyhow::ensure!(
        (MIN_YEAR..=MAX_YEAR).contains(&today.year()),
        "date out of range: {today} (years {MIN_YEAR}..={MAX_YEAR})"
    );
    anyhow::ensure!(
        window_start(today, DEFAULT_WINDOW_DAYS).is_some(),
        "no {DEFAULT_WINDOW_DAYS}-day window ends on {today}"
    );
    Ok(today)
}

/// First day of the `window` days ending at `today`, or `None` if it precedes
/// the calendar's range.
pub fn window_start(today: NaiveDate, window: usize) -> Option<NaiveDate> {
    let span = i64::try_from(window.saturating_sub(1)).ok()?;
    today.checked_sub_signed(Duration::try_days(span)?)
}

/// The `window` calendar days ending at `today`, oldest first.
///
/// Empty when the window would start before the calendar's range.
pub fn window_dates(today: NaiveDate, window: usize) -> Vec<NaiveDate> {
    match window_start(today, window) {
        Some(start) => start.iter_days().take(window).collect(),
        None => Vec::new(),
    }
}

/// Short chart label, e.g. `Jun 01`.
pub fn display_label(date: NaiveDate) -> String {
    date.format("%b %d").to_string()
}
