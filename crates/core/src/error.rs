//! Error taxonomy for rating lookups.
//!
//! Only `ProfileUnavailable` and `InvalidUsername` abort a per-user series build.
//! History and point errors are logged and degrade to a flat or partial fill.

/// Errors raised while talking to the rating source or reconstructing a series.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RatingError {
    #[error("invalid username: {username:?}")]
    InvalidUsername { username: String },

    /// `status` is the upstream HTTP status when the profile request itself failed.
    #[error("profile unavailable for {username}: {reason}")]
    ProfileUnavailable {
        username: String,
        reason: String,
        status: Option<u16>,
    },

    #[error("rating history unavailable for {username}: {reason}")]
    HistoryUnavailable { username: String, reason: String },

    #[error("malformed rating point {point}: {reason}")]
    MalformedPoint { point: String, reason: String },

    #[error("no {window}-day window ends on {today}")]
    WindowOutOfRange { today: chrono::NaiveDate, window: usize },

    #[error("leaderboard unavailable: {reason}")]
    LeaderboardUnavailable { reason: String },

    #[error("upstream unreachable ({endpoint}): {detail}")]
    UpstreamUnreachable { endpoint: String, detail: String },

    #[error("upstream HTTP {status} ({endpoint})")]
    UpstreamStatus { endpoint: String, status: u16 },

    #[error("upstream response could not be decoded ({endpoint}): {detail}")]
    UpstreamDecode { endpoint: String, detail: String },
}

impl RatingError {
    /// True when the upstream answered 404 for the requested resource,
    /// directly or as the cause of a profile failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            RatingError::UpstreamStatus { status, .. } => *status == 404,
            RatingError::ProfileUnavailable { status, .. } => *status == Some(404),
            _ => false,
        }
    }

    /// HTTP status of an upstream reply, if this error is one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            RatingError::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
