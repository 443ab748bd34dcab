use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::{Metric, Reading};

/// Decimal places kept for every mean, identical across windows so values
/// from different windows compare directly.
pub const MEAN_PRECISION: i32 = 2;

/// Decimal places kept for cumulative totals.
pub const TOTAL_PRECISION: i32 = 2;

/// Rollup of one metric over one window.
///
/// Serialized with a `status` tag so consumers cannot confuse "no readings"
/// with a genuine zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AggregateStat {
    NoData,
    Data(Summary),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    /// Arithmetic mean rounded to [`MEAN_PRECISION`] decimals.
    pub mean: f64,
    /// When the minimum was first observed.
    pub min_recorded: DateTime<Utc>,
    /// When the maximum was first observed.
    pub max_recorded: DateTime<Utc>,
    /// Sum over the window, for cumulative metrics only (rainfall).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    /// Earliest reading counted in `total`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_since: Option<DateTime<Utc>>,
    /// Wind direction in degrees reported with the maximum, wind speed only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_direction: Option<u16>,
}

impl AggregateStat {
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            AggregateStat::NoData => None,
            AggregateStat::Data(s) => Some(s),
        }
    }
}

/// Metric → rollup for one window. Every [`Metric`] is always present.
pub type WindowStats = BTreeMap<Metric, AggregateStat>;

#[derive(Debug, Clone, Copy)]
struct Extreme {
    value: f64,
    at: DateTime<Utc>,
    direction: Option<u16>,
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    metric: Metric,
    count: u64,
    sum: f64,
    first: DateTime<Utc>,
    min: Extreme,
    max: Extreme,
}

impl Accumulator {
    fn new(metric: Metric, sample: Extreme) -> Self {
        Self { metric, count: 1, sum: sample.value, first: sample.at, min: sample, max: sample }
    }

    fn push(&mut self, sample: Extreme) {
        self.count += 1;
        self.sum += sample.value;
        self.first = self.first.min(sample.at);
        // Ties keep the earliest observation regardless of input order.
        if sample.value < self.min.value || (sample.value == self.min.value && sample.at < self.min.at) {
            self.min = sample;
        }
        if sample.value > self.max.value || (sample.value == self.max.value && sample.at < self.max.at) {
            self.max = sample;
        }
    }

    fn finish(self) -> Summary {
        // Clamp guards against rounding pushing the mean outside [min, max].
        let mean = round_to(self.sum / self.count as f64, MEAN_PRECISION)
            .clamp(self.min.value, self.max.value);
        let cumulative = self.metric.is_cumulative();
        Summary {
            count: self.count,
            min: self.min.value,
            max: self.max.value,
            mean,
            min_recorded: self.min.at,
            max_recorded: self.max.at,
            total: cumulative.then(|| round_to(self.sum, TOTAL_PRECISION)),
            total_since: cumulative.then_some(self.first),
            max_direction: self.max.direction,
        }
    }
}

/// Reduce `readings` to per-metric rollups.
///
/// Only values actually present (and finite) in a reading take part in that
/// metric's rollup; a metric with no values yields [`AggregateStat::NoData`].
pub fn aggregate<'a, I>(readings: I) -> WindowStats
where
    I: IntoIterator<Item = &'a Reading>,
{
    let mut acc: BTreeMap<Metric, Accumulator> = BTreeMap::new();

    for reading in readings {
        for (&metric, &value) in reading.metrics.iter().filter(|(_, v)| v.is_finite()) {
            let sample = Extreme {
                value,
                at: reading.recorded_at,
                direction: (metric == Metric::WindSpeed)
                    .then_some(reading.wind_direction)
                    .flatten(),
            };
            acc.entry(metric)
                .and_modify(|a| a.push(sample))
                .or_insert_with(|| Accumulator::new(metric, sample));
        }
    }

    Metric::ALL
        .into_iter()
        .map(|metric| {
            let stat = match acc.remove(&metric) {
                Some(a) => AggregateStat::Data(a.finish()),
                None => AggregateStat::NoData,
            };
            (metric, stat)
        })
        .collect()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
