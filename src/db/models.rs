use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Numeric metrics carried by the station archive.
///
/// Serialized names follow the field names the station software publishes
/// (`tempF`, `relH`, ...), so downstream consumers keep working unchanged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum Metric {
    /// Degrees Fahrenheit
    #[serde(rename = "tempF")]
    Temperature,
    /// Degrees Fahrenheit
    #[serde(rename = "dewptF")]
    DewPoint,
    /// Relative humidity percentage
    #[serde(rename = "relH")]
    Humidity,
    /// Inches of mercury
    #[serde(rename = "pressure_inHg")]
    Pressure,
    /// Miles per hour
    #[serde(rename = "windSmph")]
    WindSpeed,
    /// Inches per hour
    #[serde(rename = "rainIN")]
    RainRate,
    /// Inches fallen since the previous reading
    #[serde(rename = "rainfall_IN")]
    Rainfall,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Temperature,
        Metric::DewPoint,
        Metric::Humidity,
        Metric::Pressure,
        Metric::WindSpeed,
        Metric::RainRate,
        Metric::Rainfall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Temperature => "tempF",
            Metric::DewPoint => "dewptF",
            Metric::Humidity => "relH",
            Metric::Pressure => "pressure_inHg",
            Metric::WindSpeed => "windSmph",
            Metric::RainRate => "rainIN",
            Metric::Rainfall => "rainfall_IN",
        }
    }

    /// Metrics whose window rollup also carries a running total.
    pub fn is_cumulative(self) -> bool {
        matches!(self, Metric::Rainfall)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One station observation. A metric the sensor did not report is simply
/// missing from `metrics`; it is never stored as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: String,
    pub recorded_at: DateTime<Utc>,
    pub metrics: BTreeMap<Metric, f64>,
    /// Wind direction in degrees, `0..360`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<u16>,
}

impl Reading {
    pub fn new(sensor_id: impl Into<String>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            recorded_at,
            metrics: BTreeMap::new(),
            wind_direction: None,
        }
    }

    /// Builder-style helper used by tests and the in-memory store.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.metrics.insert(metric, value);
        self
    }

    pub fn with_wind_direction(mut self, degrees: Option<u16>) -> Self {
        self.wind_direction = degrees.filter(|d| *d < 360);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}

/// Row shape of the `archive` table.
#[derive(Debug, Clone, FromRow)]
pub struct ArchiveRow {
    pub id: Uuid,
    pub sensor_id: String,
    pub recorded_at: DateTime<Utc>,
    pub temp_f: Option<f64>,
    pub dewpt_f: Option<f64>,
    pub rel_h: Option<f64>,
    pub pressure_inhg: Option<f64>,
    pub wind_speed_mph: Option<f64>,
    pub rain_in: Option<f64>,
    pub rainfall_in: Option<f64>,
    pub wind_dir: Option<i16>,
}

impl From<ArchiveRow> for Reading {
    fn from(row: ArchiveRow) -> Self {
        let columns = [
            (Metric::Temperature, row.temp_f),
            (Metric::DewPoint, row.dewpt_f),
            (Metric::Humidity, row.rel_h),
            (Metric::Pressure, row.pressure_inhg),
            (Metric::WindSpeed, row.wind_speed_mph),
            (Metric::RainRate, row.rain_in),
            (Metric::Rainfall, row.rainfall_in),
        ];

        Self {
            sensor_id: row.sensor_id,
            recorded_at: row.recorded_at,
            metrics: columns
                .into_iter()
                .filter_map(|(metric, value)| value.map(|v| (metric, v)))
                .collect(),
            wind_direction: row
                .wind_dir
                .and_then(|d| u16::try_from(d).ok())
                .filter(|d| *d < 360),
        }
    }
}

/// Latest observation of one auxiliary sensor tower.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct TowerReading {
    /// Tower sensor identifier
    pub sensor: String,
    /// Display name configured for the tower
    pub name: String,
    /// Degrees Fahrenheit
    #[serde(rename = "tempF")]
    pub temp_f: Option<f64>,
    /// Relative humidity percentage
    #[serde(rename = "relH")]
    pub rel_h: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}
