use crate::error::RatingError;
use crate::ingest::provider::RatingDataSource;
use crate::ingest::types::{Profile, TopPlayer, VariantHistory, CLASSICAL};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// In-memory rating source for tests and offline runs.
///
/// Usernames are matched case-insensitively, like the upstream API.
/// Unknown users answer with a 404 on the profile endpoint and an empty history.
#[derive(Debug, Clone, Default)]
pub struct StubDataSource {
    profiles: HashMap<String, Value>,
    histories: HashMap<String, Vec<VariantHistory>>,
    unreachable_history: HashSet<String>,
    top_players: Option<Vec<TopPlayer>>,
}

impl StubDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a profile; `None` leaves out the classical perf entirely.
    pub fn with_profile(mut self, username: &str, classical_rating: Option<i32>) -> Self {
        let mut perfs = json!({
            "blitz": {"games": 10, "rating": 1800, "rd": 70, "prog": 0}
        });
        if let Some(rating) = classical_rating {
            perfs[CLASSICAL] = json!({"games": 25, "rating": rating, "rd": 60, "prog": 5});
        }
        let raw = json!({
            "id": username.to_ascii_lowercase(),
            "username": username,
            "perfs": perfs,
        });
        self.profiles.insert(key(username), raw);
        self
    }

    pub fn with_classical_points(mut self, username: &str, points: &[[i64; 4]]) -> Self {
        self.histories
            .entry(key(username))
            .or_default()
            .push(VariantHistory {
                name: "Classical".to_string(),
                points: points
                    .iter()
                    .map(|p| p.iter().map(|&c| Value::from(c)).collect())
                    .collect(),
            });
        self
    }

    pub fn with_history(mut self, username: &str, history: Vec<VariantHistory>) -> Self {
        self.histories.insert(key(username), history);
        self
    }

    /// Makes the history endpoint fail as if the request timed out.
    pub fn with_unreachable_history(mut self, username: &str) -> Self {
        self.unreachable_history.insert(key(username));
        self
    }

    /// Sets the leaderboard. Without one, leaderboard requests fail with HTTP 503.
    pub fn with_top_players<I, S>(mut self, usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let players = usernames
            .into_iter()
            .map(|name| {
                let username = name.into();
                TopPlayer {
                    id: Some(username.to_ascii_lowercase()),
                    username,
                    title: None,
                }
            })
            .collect();
        self.top_players = Some(players);
        self
    }
}

#[async_trait::async_trait]
impl RatingDataSource for StubDataSource {
    fn source_name(&self) -> &'static str {
        "stub"
    }

    async fn fetch_profile(&self, username: &str) -> Result<(Profile, Value), RatingError> {
        let endpoint = format!("/user/{username}");
        let raw = self
            .profiles
            .get(&key(username))
            .cloned()
            .ok_or(RatingError::UpstreamStatus {
                endpoint: endpoint.clone(),
                status: 404,
            })?;
        let profile = serde_json::from_value(raw.clone()).map_err(|e| {
            RatingError::UpstreamDecode {
                endpoint,
                detail: e.to_string(),
            }
        })?;
        Ok((profile, raw))
    }

    async fn fetch_history(&self, username: &str) -> Result<Vec<VariantHistory>, RatingError> {
        let k = key(username);
        if self.unreachable_history.contains(&k) {
            return Err(RatingError::UpstreamUnreachable {
                endpoint: format!("/user/{username}/rating-history"),
                detail: "operation timed out".to_string(),
            });
        }
        Ok(self.histories.get(&k).cloned().unwrap_or_default())
    }

    async fn fetch_top_players(&self, count: usize) -> Result<Vec<TopPlayer>, RatingError> {
        let players = self
            .top_players
            .as_ref()
            .ok_or(RatingError::UpstreamStatus {
                endpoint: format!("/player/top/{count}/{CLASSICAL}"),
                status: 503,
            })?;
        Ok(players.iter().take(count).cloned().collect())
    }
}

fn key(username: &str) -> String {
    username.to_ascii_lowercase()
}
