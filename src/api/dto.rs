use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    archive::{stats::WindowStats, ArchiveReport},
    db::models::{Metric, Reading, TowerReading},
    moon::{MoonPhase, MoonState},
};

/// Latest station observation.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentConditionsDto {
    /// When the most recent station reading was recorded. `null` until the
    /// first reading arrives.
    pub timestamp: Option<DateTime<Utc>>,
    pub sensor_id: Option<String>,
    /// Metric name (`tempF`, `relH`, ...) → value, inlined next to
    /// `timestamp`. Metrics the sensor did not report are omitted.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub metrics: BTreeMap<Metric, f64>,
    /// Latest reading per tower, in display order. Omitted when towers are
    /// disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub towers: Option<Vec<TowerReading>>,
}

impl CurrentConditionsDto {
    pub fn new(latest: Option<Reading>, towers: Option<Vec<TowerReading>>) -> Self {
        match latest {
            Some(r) => Self {
                timestamp: Some(r.recorded_at),
                sensor_id: Some(r.sensor_id),
                metrics: r.metrics,
                towers,
            },
            None => Self { timestamp: None, sensor_id: None, metrics: BTreeMap::new(), towers },
        }
    }
}

/// Lunar state as published alongside the weather data.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MoonDto {
    /// Days since the last new moon, one decimal.
    pub age: f64,
    pub stage: MoonPhase,
    pub next_new: DateTime<Utc>,
    pub next_full: DateTime<Utc>,
    pub last_new: DateTime<Utc>,
    pub last_full: DateTime<Utc>,
    /// Approximate Earth–Moon distance in km, one decimal.
    pub distance: f64,
    /// Illuminated percentage, whole number.
    pub illumination: u8,
    /// Display icon index, `round(age)`.
    pub icon: u8,
    /// Same freshness marker as `current.timestamp`.
    pub timestamp: Option<DateTime<Utc>>,
}

impl MoonDto {
    pub fn new(state: &MoonState, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            age: (state.age * 10.0).round() / 10.0,
            stage: state.phase,
            next_new: state.next_new_moon,
            next_full: state.next_full_moon,
            last_new: state.last_new_moon,
            last_full: state.last_full_moon,
            distance: (state.distance_km * 10.0).round() / 10.0,
            illumination: state.illumination,
            icon: state.icon(),
            timestamp,
        }
    }
}

/// Response for `GET /data`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DataResponse {
    pub current: CurrentConditionsDto,
    #[schema(value_type = Object)]
    pub yesterday: WindowStats,
    #[schema(value_type = Object)]
    pub this_week: WindowStats,
    #[schema(value_type = Object)]
    pub this_month: WindowStats,
    #[schema(value_type = Object)]
    pub last_month: WindowStats,
    #[schema(value_type = Object)]
    pub this_year: WindowStats,
    #[schema(value_type = Object)]
    pub all_time: WindowStats,
    pub moon: MoonDto,
}

impl DataResponse {
    pub fn new(current: CurrentConditionsDto, archive: ArchiveReport, moon: MoonDto) -> Self {
        Self {
            current,
            yesterday: archive.yesterday,
            this_week: archive.this_week,
            this_month: archive.this_month,
            last_month: archive.last_month,
            this_year: archive.this_year,
            all_time: archive.all_time,
            moon,
        }
    }
}
