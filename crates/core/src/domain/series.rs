use crate::domain::rating::{validate_username, RatingPoint, RatingSeries};
use crate::error::RatingError;
use crate::ingest::provider::RatingDataSource;
use crate::ingest::types::VariantHistory;
use crate::time::window::{window_dates, window_start, DEFAULT_WINDOW_DAYS};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Classical points from the upstream history, plus the tuples that failed to parse.
pub fn classical_points(history: &[VariantHistory]) -> (Vec<RatingPoint>, Vec<RatingError>) {
    let mut points = Vec::new();
    let mut rejected = Vec::new();

    for raw in history
        .iter()
        .filter(|v| v.is_classical())
        .flat_map(|v| v.points.iter())
    {
        match RatingPoint::from_tuple(raw) {
            Ok(p) => points.push(p),
            Err(err) => rejected.push(err),
        }
    }

    (points, rejected)
}

/// Forward-fills `points` over the `window` days ending at `today`.
///
/// `seed` is used until the first observed day inside the window. When two points
/// share a date the later one in `points` wins. Returns one rating and one
/// observed flag per day, oldest first. Empty if the window starts before the
/// calendar's range.
pub fn fill_forward(
    points: &[RatingPoint],
    seed: i32,
    today: NaiveDate,
    window: usize,
) -> (Vec<i32>, Vec<bool>) {
    let by_date: HashMap<NaiveDate, i32> = points.iter().map(|p| (p.date, p.rating)).collect();

    let mut ratings = Vec::with_capacity(window);
    let mut observed = Vec::with_capacity(window);
    let mut last = seed;
    for day in window_dates(today, window) {
        let hit = by_date.get(&day).copied();
        if let Some(r) = hit {
            last = r;
        }
        ratings.push(last);
        observed.push(hit.is_some());
    }

    (ratings, observed)
}

/// Builds the daily classical rating series for one player from a [`RatingDataSource`].
pub struct RatingSeriesBuilder<'a> {
    source: &'a dyn RatingDataSource,
    window: usize,
}

impl<'a> RatingSeriesBuilder<'a> {
    pub fn new(source: &'a dyn RatingDataSource) -> Self {
        Self {
            source,
            window: DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub async fn build(&self, username: &str, today: NaiveDate) -> Result<RatingSeries, RatingError> {
        let username = validate_username(username)?;
        let start = window_start(today, self.window).ok_or(RatingError::WindowOutOfRange {
            today,
            window: self.window,
        })?;

        let (profile, _) = self.source.fetch_profile(username).await.map_err(|e| {
            RatingError::ProfileUnavailable {
                username: username.to_string(),
                reason: e.to_string(),
                status: e.upstream_status(),
            }
        })?;

        let current_rating =
            profile
                .classical_rating()
                .ok_or_else(|| RatingError::ProfileUnavailable {
                    username: username.to_string(),
                    reason: "no classical rating".to_string(),
                    status: None,
                })?;

        let history = match self.source.fetch_history(username).await {
            Ok(h) => h,
            Err(e) => {
                let err = RatingError::HistoryUnavailable {
                    username: username.to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!(
                    source = self.source.source_name(),
                    error = %err,
                    "using current rating for the whole window"
                );
                Vec::new()
            }
        };

        let (points, rejected) = classical_points(&history);
        for err in &rejected {
            tracing::warn!(%username, error = %err, "skipping rating point");
        }

        let (ratings, observed) = fill_forward(&points, current_rating, today, self.window);
        let end = today;

        tracing::debug!(
            %username,
            current_rating,
            points = points.len(),
            skipped = rejected.len(),
            %start,
            %end,
            "built rating series"
        );

        Ok(RatingSeries {
            username: username.to_string(),
            current_rating,
            start,
            end,
            ratings,
            observed,
            skipped_points: rejected.len(),
        })
    }
}
