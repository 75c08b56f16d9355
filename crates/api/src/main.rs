use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rating_board_core::domain::rating::validate_username;
use rating_board_core::domain::RatingSeriesBuilder;
use rating_board_core::error::RatingError;
use rating_board_core::ingest::{LichessClient, RatingDataSource};
use rating_board_core::report::{self, csv::CSV_FILENAME, TopPlayerHistory};
use rating_board_core::time::resolve_today;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = rating_board_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let client = LichessClient::from_settings(&settings)?;
    tracing::info!(
        base_url = %settings.lichess_api_url,
        authenticated = settings.lichess_token.is_some(),
        timeout_secs = settings.request_timeout_secs,
        "lichess client ready"
    );

    let state = AppState {
        source: Arc::new(client),
        top_count: settings.top_players_count,
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/user/:username", get(get_user))
        .route("/user/:username/rating-series", get(get_user_rating_series))
        .route("/top-classical-players/names", get(get_top_classical_players_names))
        .route("/top-player/30day-history", get(get_top_player_history))
        .route("/top50/rating-history-csv", get(get_top_rating_history_csv))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    source: Arc<dyn RatingDataSource>,
    top_count: usize,
}

/// Optional `?today=YYYY-MM-DD` override for the end of the window.
#[derive(Debug, Default, Deserialize)]
struct WindowQuery {
    today: Option<String>,
}

impl WindowQuery {
    fn today(&self) -> Result<NaiveDate, ApiError> {
        resolve_today(self.today.as_deref(), Utc::now()).map_err(ApiError::bad_request)
    }
}

#[derive(Debug, Serialize)]
struct Success<T> {
    status: &'static str,
    #[serde(flatten)]
    body: T,
}

impl<T> Success<T> {
    fn new(body: T) -> Json<Self> {
        Json(Self {
            status: "success",
            body,
        })
    }
}

#[derive(Debug, Serialize)]
struct PlayerNames {
    count: usize,
    names: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PlayerSeries {
    player: String,
    current_rating: i32,
    start: NaiveDate,
    end: NaiveDate,
    dates: Vec<NaiveDate>,
    ratings: Vec<i32>,
    skipped_points: usize,
}

async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let username = validate_username(&username)?;
    let (_, raw) = state.source.fetch_profile(username).await?;
    Ok(Json(raw))
}

async fn get_user_rating_series(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Success<PlayerSeries>>, ApiError> {
    let today = query.today()?;
    let series = RatingSeriesBuilder::new(state.source.as_ref())
        .build(&username, today)
        .await?;

    Ok(Success::new(PlayerSeries {
        dates: series.dates(),
        player: series.username,
        current_rating: series.current_rating,
        start: series.start,
        end: series.end,
        ratings: series.ratings,
        skipped_points: series.skipped_points,
    }))
}

async fn get_top_classical_players_names(
    State(state): State<AppState>,
) -> Result<Json<Success<PlayerNames>>, ApiError> {
    let names = report::top_player_names(state.source.as_ref(), state.top_count).await?;
    Ok(Success::new(PlayerNames {
        count: names.len(),
        names,
    }))
}

async fn get_top_player_history(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Success<TopPlayerHistory>>, ApiError> {
    let today = query.today()?;
    let history = report::top_player_history(state.source.as_ref(), today).await?;
    Ok(Success::new(history))
}

async fn get_top_rating_history_csv(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Response, ApiError> {
    let today = query.today()?;
    let export = report::top_players_csv(state.source.as_ref(), today, state.top_count).await?;

    tracing::info!(
        %today,
        written = export.written,
        skipped = export.skipped.len(),
        "serving rating history csv"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={CSV_FILENAME}"),
            ),
        ],
        export.body,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

struct ApiError {
    status: StatusCode,
    error: anyhow::Error,
}

impl ApiError {
    fn bad_request(error: anyhow::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        Self {
            status: status_for(&error),
            error,
        }
    }
}

fn status_for(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<RatingError>() {
        Some(RatingError::InvalidUsername { .. } | RatingError::WindowOutOfRange { .. }) => {
            StatusCode::BAD_REQUEST
        }
        Some(e) if e.is_not_found() => StatusCode::NOT_FOUND,
        Some(_) => StatusCode::BAD_GATEWAY,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %format!("{:#}", self.error), "request failed");
        }
        if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            sentry_anyhow::capture_anyhow(&self.error);
        }

        let body = ErrorBody {
            status: "error",
            message: format!("{:#}", self.error),
        };
        (self.status, Json(body)).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
