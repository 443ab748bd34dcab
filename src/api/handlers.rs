use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use utoipa::OpenApi;

use super::{
    dto::{CurrentConditionsDto, DataResponse, MoonDto},
    errors::AppError,
    AppState,
};
use crate::{
    archive::{
        stats::{AggregateStat, Summary, WindowStats},
        window::WindowKind,
        ArchiveAggregator, ArchiveError,
    },
    db::models::{Metric, TowerReading},
    moon::{MoonPhase, MoonState},
    store::ReadingSource,
};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct MoonParams {
    pub at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Current conditions, the six archive rollups and the lunar state, in one
/// response. "Now" is captured once and shared by every window and the moon.
#[utoipa::path(
    get,
    path = "/data",
    responses(
        (status = 200, description = "Aggregated station data", body = DataResponse),
        (status = 503, description = "Reading store unavailable"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "weather"
)]
pub async fn get_data(State(state): State<AppState>) -> Result<Json<DataResponse>, AppError> {
    let now = Utc::now();
    let aggregator = ArchiveAggregator::new(&state.store, now, state.tz);

    let (archive, latest, towers) = tokio::try_join!(
        aggregator.report(),
        async { state.store.latest_reading().await.map_err(ArchiveError::from) },
        async {
            if state.towers_enabled {
                state
                    .store
                    .latest_tower_readings()
                    .await
                    .map(Some)
                    .map_err(ArchiveError::from)
            } else {
                Ok(None)
            }
        },
    )?;

    let moon = MoonState::at(now)?;
    let timestamp = latest.as_ref().map(|r| r.recorded_at);
    debug!(now = %now, latest = ?timestamp, phase = %moon.phase, "Station data assembled");

    Ok(Json(DataResponse::new(
        CurrentConditionsDto::new(latest, towers),
        archive,
        MoonDto::new(&moon, timestamp),
    )))
}

/// Lunar state now, or at `?at=<RFC3339>`.
#[utoipa::path(
    get,
    path = "/moon",
    params(
        ("at" = Option<DateTime<Utc>>, Query, description = "Instant to evaluate (RFC3339); defaults to now"),
    ),
    responses(
        (status = 200, description = "Lunar state", body = MoonDto),
        (status = 400, description = "Instant outside the supported range"),
    ),
    tag = "moon"
)]
pub async fn get_moon(
    State(state): State<AppState>,
    Query(params): Query<MoonParams>,
) -> Result<Json<MoonDto>, AppError> {
    let moon = MoonState::at(params.at.unwrap_or_else(Utc::now))?;
    // The store only supplies the freshness marker; the lunar state stands alone.
    let timestamp = match state.store.latest_reading().await {
        Ok(latest) => latest.map(|r| r.recorded_at),
        Err(e) => {
            warn!(error = %e, "Latest reading unavailable, serving moon without timestamp");
            None
        }
    };

    Ok(Json(MoonDto::new(&moon, timestamp)))
}

/// Rollup of a single archive window.
#[utoipa::path(
    get,
    path = "/archive/{window}",
    params(
        ("window" = WindowKind, Path, description = "Archive window"),
    ),
    responses(
        (status = 200, description = "Metric name → rollup"),
        (status = 400, description = "Unknown window"),
        (status = 503, description = "Reading store unavailable"),
    ),
    tag = "weather"
)]
pub async fn get_archive_window(
    State(state): State<AppState>,
    Path(window): Path<String>,
) -> Result<Json<WindowStats>, AppError> {
    let window: WindowKind = window.parse()?;
    let stats = ArchiveAggregator::new(&state.store, Utc::now(), state.tz)
        .window(window)
        .await?;
    Ok(Json(stats))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    paths(get_data, get_moon, get_archive_window, health),
    components(schemas(
        DataResponse,
        CurrentConditionsDto,
        MoonDto,
        MoonPhase,
        AggregateStat,
        Summary,
        Metric,
        WindowKind,
        TowerReading,
    )),
    tags(
        (name = "weather", description = "Current conditions and archive rollups"),
        (name = "moon",    description = "Lunar state"),
        (name = "system",  description = "System endpoints"),
    ),
    info(
        title = "Weather Archive API",
        version = "0.1.0",
        description = "Station readings, archive rollups and lunar state"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
