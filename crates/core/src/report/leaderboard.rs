use crate::domain::series::RatingSeriesBuilder;
use crate::error::RatingError;
use crate::ingest::provider::RatingDataSource;
use crate::time::window::{display_label, ISO_DATE};
use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

pub async fn top_player_names(
    source: &dyn RatingDataSource,
    count: usize,
) -> anyhow::Result<Vec<String>> {
    let players = source
        .fetch_top_players(count)
        .await
        .map_err(|e| RatingError::LeaderboardUnavailable {
            reason: e.to_string(),
        })?;

    Ok(players.into_iter().map(|p| p.username).collect())
}

/// Username of the current classical number one.
pub async fn top_player(source: &dyn RatingDataSource) -> anyhow::Result<String> {
    let names = top_player_names(source, 1).await?;
    let Some(name) = names.into_iter().next() else {
        tracing::error!(source = source.source_name(), "leaderboard returned no players");
        return Err(RatingError::LeaderboardUnavailable {
            reason: "no players returned".to_string(),
        }
        .into());
    };
    Ok(name)
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyRating {
    pub date: NaiveDate,
    pub label: String,
    pub rating: i32,
    pub is_estimated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopPlayerHistory {
    pub player: String,
    pub current_rating: i32,
    /// ISO date -> rating; ISO keys keep the map in date order.
    pub history: BTreeMap<String, i32>,
    pub days: Vec<DailyRating>,
}

pub async fn top_player_history(
    source: &dyn RatingDataSource,
    today: NaiveDate,
) -> anyhow::Result<TopPlayerHistory> {
    let player = top_player(source).await?;

    let series = RatingSeriesBuilder::new(source)
        .build(&player, today)
        .await
        .with_context(|| format!("rating series for top player {player}"))?;

    let days: Vec<DailyRating> = series
        .dates()
        .into_iter()
        .zip(series.ratings.iter().zip(series.observed.iter()))
        .map(|(date, (&rating, &observed))| DailyRating {
            date,
            label: display_label(date),
            rating,
            is_estimated: !observed,
        })
        .collect();

    let history = days
        .iter()
        .map(|d| (d.date.format(ISO_DATE).to_string(), d.rating))
        .collect();

    Ok(TopPlayerHistory {
        current_rating: series.latest().unwrap_or(series.current_rating),
        player: series.username,
        history,
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::stub::StubDataSource;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn names_follow_leaderboard_order() {
        let src = StubDataSource::new().with_top_players(["Zed", "Amy", "Kim"]);
        let names = top_player_names(&src, 50).await.unwrap();
        assert_eq!(names, ["Zed", "Amy", "Kim"]);
    }

    #[tokio::test]
    async fn leaderboard_failure_is_typed() {
        let src = StubDataSource::new();
        let err = top_player_names(&src, 50).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::LeaderboardUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn empty_leaderboard_has_no_top_player() {
        let src = StubDataSource::new().with_top_players(Vec::<String>::new());
        assert!(top_player(&src).await.is_err());
    }

    #[tokio::test]
    async fn top_player_history_marks_estimated_days() {
        let src = StubDataSource::new()
            .with_top_players(["Champ", "Runner"])
            .with_profile("Champ", Some(2700))
            .with_classical_points("Champ", &[[2024, 6, 15, 2690], [2024, 6, 28, 2710]]);

        let h = top_player_history(&src, d(2024, 6, 30)).await.unwrap();
        assert_eq!(h.player, "Champ");
        assert_eq!(h.current_rating, 2710);
        assert_eq!(h.days.len(), 30);
        assert_eq!(h.history.len(), 30);
        assert_eq!(h.history["2024-06-01"], 2700);
        assert_eq!(h.history["2024-06-20"], 2690);
        assert_eq!(h.days[0].label, "Jun 01");
        assert!(h.days[0].is_estimated);
        assert!(!h.days[14].is_estimated);
        assert_eq!(h.days.iter().filter(|d| !d.is_estimated).count(), 2);
    }

    #[tokio::test]
    async fn top_player_without_rating_keeps_profile_error() {
        let src = StubDataSource::new()
            .with_top_players(["Champ"])
            .with_profile("Champ", None);

        let err = top_player_history(&src, d(2024, 6, 30)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RatingError>(),
            Some(RatingError::ProfileUnavailable { .. })
        ));
    }
}
