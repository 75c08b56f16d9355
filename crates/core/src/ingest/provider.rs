use crate::config::Settings;
use crate::error::RatingError;
use crate::ingest::types::{Profile, TopPlayer, TopPlayersResponse, VariantHistory, CLASSICAL};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[async_trait::async_trait]
pub trait RatingDataSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Parsed profile plus the raw upstream document.
    async fn fetch_profile(&self, username: &str) -> Result<(Profile, Value), RatingError>;

    async fn fetch_history(&self, username: &str) -> Result<Vec<VariantHistory>, RatingError>;

    /// Classical leaderboard, best first.
    async fn fetch_top_players(&self, count: usize) -> Result<Vec<TopPlayer>, RatingError>;
}

#[derive(Debug, Clone)]
pub struct LichessClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    retries: u32,
}

impl LichessClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build lichess http client")?;

        Ok(Self {
            http,
            base_url: settings.lichess_api_url.clone(),
            token: settings.lichess_token.clone(),
            retries: settings.request_retries.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self, endpoint: &str) -> Result<HeaderMap, RatingError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                RatingError::UpstreamUnreachable {
                    endpoint: endpoint.to_string(),
                    detail: format!("invalid bearer token: {e}"),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn get_json_once(&self, endpoint: &str) -> Result<Value, RatingError> {
        let headers = self.headers(endpoint)?;

        let res = self
            .http
            .get(self.url(endpoint))
            .headers(headers)
            .send()
            .await
            .map_err(|e| RatingError::UpstreamUnreachable {
                endpoint: endpoint.to_string(),
                detail: e.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(RatingError::UpstreamStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        res.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                RatingError::UpstreamUnreachable {
                    endpoint: endpoint.to_string(),
                    detail: e.to_string(),
                }
            } else {
                RatingError::UpstreamDecode {
                    endpoint: endpoint.to_string(),
                    detail: e.to_string(),
                }
            }
        })
    }

    async fn get_json(&self, endpoint: &str) -> Result<Value, RatingError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_json_once(endpoint).await {
                Ok(v) => return Ok(v),
                Err(err) => {
                    if attempt >= self.retries || !is_retryable(&err) {
                        tracing::error!(endpoint, attempt, error = %err, "lichess request failed");
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(endpoint, attempt, ?backoff, error = %err, "lichess request failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl RatingDataSource for LichessClient {
    fn source_name(&self) -> &'static str {
        "lichess"
    }

    async fn fetch_profile(&self, username: &str) -> Result<(Profile, Value), RatingError> {
        let endpoint = format!("/user/{username}");
        let raw = self.get_json(&endpoint).await?;
        let profile = decode::<Profile>(&endpoint, raw.clone())?;
        Ok((profile, raw))
    }

    async fn fetch_history(&self, username: &str) -> Result<Vec<VariantHistory>, RatingError> {
        let endpoint = format!("/user/{username}/rating-history");
        let raw = self.get_json(&endpoint).await?;
        decode(&endpoint, raw)
    }

    async fn fetch_top_players(&self, count: usize) -> Result<Vec<TopPlayer>, RatingError> {
        let endpoint = format!("/player/top/{count}/{CLASSICAL}");
        let raw = self.get_json(&endpoint).await?;
        let parsed = decode::<TopPlayersResponse>(&endpoint, raw)?;
        Ok(parsed.users)
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, raw: Value) -> Result<T, RatingError> {
    serde_json::from_value(raw).map_err(|e| RatingError::UpstreamDecode {
        endpoint: endpoint.to_string(),
        detail: e.to_string(),
    })
}

// Client errors will not change on a second attempt; network failures and 5xx might.
fn is_retryable(err: &RatingError) -> bool {
    match err {
        RatingError::UpstreamUnreachable { .. } => true,
        RatingError::UpstreamStatus { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str, token: Option<&str>) -> LichessClient {
        let settings = Settings {
            lichess_api_url: base_url.to_string(),
            lichess_token: token.map(str::to_string),
            request_retries: 0,
            ..Settings::default()
        };
        LichessClient::from_settings(&settings).unwrap()
    }

    #[test]
    fn joins_base_url_and_endpoint() {
        let c = client("https://lichess.org/api/", None);
        assert_eq!(c.url("/user/alice"), "https://lichess.org/api/user/alice");
        assert_eq!(c.url("player/top/50/classical"), "https://lichess.org/api/player/top/50/classical");
    }

    #[test]
    fn zero_retries_still_makes_one_attempt() {
        assert_eq!(client("https://lichess.org/api", None).retries, 1);
    }

    #[test]
    fn sends_bearer_token_only_when_configured() {
        let anon = client("https://lichess.org/api", None);
        assert!(anon.headers("/user/alice").unwrap().get(AUTHORIZATION).is_none());

        let authed = client("https://lichess.org/api", Some("lip_abc"));
        let headers = authed.headers("/user/alice").unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer lip_abc");
    }

    #[test]
    fn only_transient_failures_are_retried() {
        let endpoint = "/user/alice".to_string();
        assert!(is_retryable(&RatingError::UpstreamUnreachable {
            endpoint: endpoint.clone(),
            detail: "timed out".into(),
        }));
        assert!(is_retryable(&RatingError::UpstreamStatus {
            endpoint: endpoint.clone(),
            status: 503,
        }));
        assert!(!is_retryable(&RatingError::UpstreamStatus {
            endpoint: endpoint.clone(),
            status: 404,
        }));
        assert!(!is_retryable(&RatingError::UpstreamDecode {
            endpoint,
            detail: "expected array".into(),
        }));
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_upstream_unreachable() {
        // Port 9 (discard) on loopback is closed in test environments.
        let c = client("http://127.0.0.1:9", None);
        let err = c.fetch_history("alice").await.unwrap_err();
        assert!(
            matches!(err, RatingError::UpstreamUnreachable { ref endpoint, .. } if endpoint == "/user/alice/rating-history"),
            "unexpected error: {err:?}"
        );
    }
}
