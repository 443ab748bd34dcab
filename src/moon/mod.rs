//! Lunar phase, illumination and distance from a mean-motion model.
//!
//! Everything here is a pure function of one instant: a reference new moon
//! plus the mean synodic period give the age and the surrounding new/full
//! moons. Results drift from true ephemerides by up to roughly half a day
//! because the real lunation length varies around the mean.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Mean synodic month, in days.
pub const SYNODIC_PERIOD_DAYS: f64 = 29.530588853;

/// A reference new moon: 2000-01-06T18:14:00Z, in Unix milliseconds.
pub const EPOCH_NEW_MOON_MS: i64 = 947_182_440_000;

/// J2000.0 (2000-01-01T12:00:00Z), in Unix milliseconds.
const J2000_MS: i64 = 946_728_000_000;

const MS_PER_DAY: f64 = 86_400_000.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

/// 0001-01-01T00:00:00Z and 9999-12-31T23:59:59.999Z.
const MIN_INSTANT_MS: i64 = -62_135_596_800_000;
const MAX_INSTANT_MS: i64 = 253_402_300_799_999;

/// Mean Earth–Moon distance and the amplitude of the principal
/// (eccentricity) term of the lunar distance series, in km.
const MEAN_DISTANCE_KM: f64 = 385_000.56;
const DISTANCE_AMPLITUDE_KM: f64 = 20_905.355;

/// Moon's mean anomaly at J2000 and its rate, in degrees / degrees per
/// Julian century.
const MEAN_ANOMALY_J2000_DEG: f64 = 134.963_396_4;
const MEAN_ANOMALY_RATE_DEG: f64 = 477_198.867_505_5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoonError {
    #[error("invalid instant: {0}")]
    InvalidInstant(String),
}

// ---------------------------------------------------------------------------
// MoonPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum MoonPhase {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Waxing Crescent")]
    WaxingCrescent,
    #[serde(rename = "First Quarter")]
    FirstQuarter,
    #[serde(rename = "Waxing Gibbous")]
    WaxingGibbous,
    #[serde(rename = "Full")]
    Full,
    #[serde(rename = "Waning Gibbous")]
    WaningGibbous,
    #[serde(rename = "Last Quarter")]
    LastQuarter,
    #[serde(rename = "Waning Crescent")]
    WaningCrescent,
}

impl MoonPhase {
    const ORDER: [MoonPhase; 8] = [
        MoonPhase::New,
        MoonPhase::WaxingCrescent,
        MoonPhase::FirstQuarter,
        MoonPhase::WaxingGibbous,
        MoonPhase::Full,
        MoonPhase::WaningGibbous,
        MoonPhase::LastQuarter,
        MoonPhase::WaningCrescent,
    ];

    /// Bucket a synodic age (days) into one of eight phases.
    ///
    /// Each bucket is `P/8` wide and centred on its principal phase, so New
    /// covers `[-P/16, P/16)` around the wrap. A boundary age belongs to the
    /// following phase.
    pub fn from_age(age_days: f64) -> Self {
        let index = ((age_days / SYNODIC_PERIOD_DAYS) * 8.0 + 0.5).floor();
        Self::ORDER[(index as i64).rem_euclid(8) as usize]
    }

    pub fn label(self) -> &'static str {
        match self {
            MoonPhase::New => "New",
            MoonPhase::WaxingCrescent => "Waxing Crescent",
            MoonPhase::FirstQuarter => "First Quarter",
            MoonPhase::WaxingGibbous => "Waxing Gibbous",
            MoonPhase::Full => "Full",
            MoonPhase::WaningGibbous => "Waning Gibbous",
            MoonPhase::LastQuarter => "Last Quarter",
            MoonPhase::WaningCrescent => "Waning Crescent",
        }
    }
}

impl fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// MoonState
// ---------------------------------------------------------------------------

/// Lunar state at one instant. Never stored; recompute with [`MoonState::at`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoonState {
    pub at: DateTime<Utc>,
    /// Days since the last new moon, `0 <= age < SYNODIC_PERIOD_DAYS`.
    pub age: f64,
    pub phase: MoonPhase,
    /// Illuminated fraction of the disc, percent rounded to a whole number.
    pub illumination: u8,
    /// Approximate Earth–Moon distance; see [`distance_km`].
    pub distance_km: f64,
    pub next_new_moon: DateTime<Utc>,
    pub next_full_moon: DateTime<Utc>,
    pub last_new_moon: DateTime<Utc>,
    pub last_full_moon: DateTime<Utc>,
}

impl MoonState {
    pub fn at(t: DateTime<Utc>) -> Result<Self, MoonError> {
        let age = age(t)?;
        let (last_new_moon, next_new_moon) = bracket(t, 0.0)?;
        let (last_full_moon, next_full_moon) = bracket(t, SYNODIC_PERIOD_DAYS / 2.0)?;

        Ok(Self {
            at: t,
            age,
            phase: MoonPhase::from_age(age),
            illumination: illumination_percent(age),
            distance_km: distance_km(t)?,
            next_new_moon,
            next_full_moon,
            last_new_moon,
            last_full_moon,
        })
    }

    /// Same as [`MoonState::at`] for fractional Unix seconds.
    pub fn at_unix_seconds(secs: f64) -> Result<Self, MoonError> {
        Self::at(instant_from_unix_seconds(secs)?)
    }

    /// Index of the display icon for this age: `round(age)`, `0..=30`.
    pub fn icon(&self) -> u8 {
        self.age.round() as u8
    }
}

// ---------------------------------------------------------------------------
// Pure functions
// ---------------------------------------------------------------------------

/// Synodic age in days, normalized into `[0, SYNODIC_PERIOD_DAYS)`.
pub fn age(t: DateTime<Utc>) -> Result<f64, MoonError> {
    let age = days_since_epoch(t)?.rem_euclid(SYNODIC_PERIOD_DAYS);
    // rem_euclid of a tiny negative value can round up to the modulus itself.
    Ok(if age >= SYNODIC_PERIOD_DAYS { 0.0 } else { age })
}

pub fn phase(t: DateTime<Utc>) -> Result<MoonPhase, MoonError> {
    Ok(MoonPhase::from_age(age(t)?))
}

/// Illuminated percentage at `t`, `0..=100`.
pub fn illumination(t: DateTime<Utc>) -> Result<u8, MoonError> {
    Ok(illumination_percent(age(t)?))
}

/// Approximate Earth–Moon distance in km.
///
/// Mean distance minus the principal term of the lunar distance series,
/// driven by the Moon's mean anomaly (anomalistic month, ~27.55 days). This
/// ignores the evection and variation terms and is good to a few thousand
/// km: suitable for display, not for ephemeris work.
pub fn distance_km(t: DateTime<Utc>) -> Result<f64, MoonError> {
    let ms = checked_millis(t)?;
    let centuries = (ms - J2000_MS) as f64 / MS_PER_DAY / DAYS_PER_JULIAN_CENTURY;
    let mean_anomaly = (MEAN_ANOMALY_J2000_DEG + MEAN_ANOMALY_RATE_DEG * centuries).rem_euclid(360.0);
    Ok(MEAN_DISTANCE_KM - DISTANCE_AMPLITUDE_KM * mean_anomaly.to_radians().cos())
}

/// First new moon strictly after `t`.
pub fn next_new_moon(t: DateTime<Utc>) -> Result<DateTime<Utc>, MoonError> {
    Ok(bracket(t, 0.0)?.1)
}

/// Most recent new moon at or before `t`.
pub fn last_new_moon(t: DateTime<Utc>) -> Result<DateTime<Utc>, MoonError> {
    Ok(bracket(t, 0.0)?.0)
}

/// First full moon strictly after `t`.
pub fn next_full_moon(t: DateTime<Utc>) -> Result<DateTime<Utc>, MoonError> {
    Ok(bracket(t, SYNODIC_PERIOD_DAYS / 2.0)?.1)
}

/// Most recent full moon at or before `t`.
pub fn last_full_moon(t: DateTime<Utc>) -> Result<DateTime<Utc>, MoonError> {
    Ok(bracket(t, SYNODIC_PERIOD_DAYS / 2.0)?.0)
}

/// Convert fractional Unix seconds into an instant, rejecting non-finite
/// values and anything outside years 1..=9999.
pub fn instant_from_unix_seconds(secs: f64) -> Result<DateTime<Utc>, MoonError> {
    if !secs.is_finite() {
        return Err(MoonError::InvalidInstant(format!("{secs} is not finite")));
    }
    let ms = (secs * 1000.0).round();
    if ms < MIN_INSTANT_MS as f64 || ms > MAX_INSTANT_MS as f64 {
        return Err(MoonError::InvalidInstant(format!("{secs}s is out of range")));
    }
    DateTime::from_timestamp_millis(ms as i64)
        .ok_or_else(|| MoonError::InvalidInstant(format!("{secs}s is out of range")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn illumination_percent(age: f64) -> u8 {
    let theta = std::f64::consts::TAU * age / SYNODIC_PERIOD_DAYS;
    let fraction = (1.0 - theta.cos()) / 2.0;
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

fn checked_millis(t: DateTime<Utc>) -> Result<i64, MoonError> {
    let ms = t.timestamp_millis();
    if (MIN_INSTANT_MS..=MAX_INSTANT_MS).contains(&ms) {
        Ok(ms)
    } else {
        Err(MoonError::InvalidInstant(format!("{t} is out of range")))
    }
}

fn days_since_epoch(t: DateTime<Utc>) -> Result<f64, MoonError> {
    let ms = checked_millis(t)?;
    let sub_ms = f64::from(t.timestamp_subsec_nanos() % 1_000_000) / 1e6;
    Ok(((ms - EPOCH_NEW_MOON_MS) as f64 + sub_ms) / MS_PER_DAY)
}

/// Instant of the `cycle`-th lunation (counted from the epoch) shifted by
/// `offset_days`.
fn lunation(offset_days: f64, cycle: i64) -> Result<DateTime<Utc>, MoonError> {
    let days = offset_days + cycle as f64 * SYNODIC_PERIOD_DAYS;
    let ms = EPOCH_NEW_MOON_MS as f64 + (days * MS_PER_DAY).round();
    if ms < MIN_INSTANT_MS as f64 || ms > MAX_INSTANT_MS as f64 {
        return Err(MoonError::InvalidInstant(format!(
            "lunation {cycle} falls outside the supported range"
        )));
    }
    DateTime::from_timestamp_millis(ms as i64)
        .ok_or_else(|| MoonError::InvalidInstant(format!("lunation {cycle} is not representable")))
}

/// `(last, next)` lunations of the series offset by `offset_days` such that
/// `last <= t < next`.
fn bracket(t: DateTime<Utc>, offset_days: f64) -> Result<(DateTime<Utc>, DateTime<Utc>), MoonError> {
    let elapsed = days_since_epoch(t)? - offset_days;
    let mut cycle = (elapsed / SYNODIC_PERIOD_DAYS).floor() as i64;

    // Millisecond rounding can push an instant across `t`; nudge once.
    let mut last = lunation(offset_days, cycle)?;
    if last > t {
        cycle -= 1;
        last = lunation(offset_days, cycle)?;
    }
    let mut next = lunation(offset_days, cycle + 1)?;
    if next <= t {
        last = next;
        next = lunation(offset_days, cycle + 2)?;
    }
    Ok((last, next))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 6, 18, 14, 0).unwrap()
    }

    fn period() -> Duration {
        Duration::milliseconds((SYNODIC_PERIOD_DAYS * MS_PER_DAY).round() as i64)
    }

    fn days(d: f64) -> Duration {
        Duration::milliseconds((d * MS_PER_DAY).round() as i64)
    }

    /// Instants spread over four centuries at an odd stride.
    fn sample_instants() -> impl Iterator<Item = DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(1850, 1, 1, 0, 0, 0).unwrap();
        (0..4000).map(move |i| start + Duration::minutes(i * 52_711))
    }

    #[test]
    fn epoch_is_new_moon() {
        let state = MoonState::at(epoch()).unwrap();
        assert_eq!(state.age, 0.0);
        assert_eq!(state.phase, MoonPhase::New);
        assert_eq!(state.illumination, 0);
        assert_eq!(state.last_new_moon, epoch());
        assert_eq!(state.next_new_moon, epoch() + period());
    }

    #[test]
    fn half_period_after_epoch_is_full() {
        let t = epoch() + days(14.765);
        let state = MoonState::at(t).unwrap();
        assert!((state.age - 14.765).abs() < 1e-6, "age {}", state.age);
        assert_eq!(state.phase, MoonPhase::Full);
        assert_eq!(state.phase.to_string(), "Full");
        assert_eq!(state.illumination, 100);
        assert_eq!(state.icon(), 15);
    }

    #[test]
    fn age_stays_in_range() {
        for t in sample_instants() {
            let a = age(t).unwrap();
            assert!((0.0..SYNODIC_PERIOD_DAYS).contains(&a), "{t}: {a}");
        }
    }

    #[test]
    fn age_is_continuous_except_at_wrap() {
        let step = Duration::hours(1);
        for t in sample_instants() {
            let (a0, a1) = (age(t).unwrap(), age(t + step).unwrap());
            let delta = a1 - a0;
            let wrapped = delta + SYNODIC_PERIOD_DAYS;
            let one_hour = 1.0 / 24.0;
            assert!(
                (delta - one_hour).abs() < 1e-6 || (wrapped - one_hour).abs() < 1e-6,
                "{t}: {a0} -> {a1}"
            );
        }
    }

    #[test]
    fn illumination_tracks_age() {
        for t in sample_instants() {
            let pct = illumination(t).unwrap();
            assert!(pct <= 100);
        }
        assert_eq!(illumination(epoch()).unwrap(), 0);
        assert_eq!(illumination(epoch() + days(SYNODIC_PERIOD_DAYS / 2.0)).unwrap(), 100);
        assert_eq!(illumination(epoch() + days(SYNODIC_PERIOD_DAYS / 4.0)).unwrap(), 50);
    }

    #[test]
    fn phase_buckets_are_centred_and_boundaries_go_forward() {
        let eighth = SYNODIC_PERIOD_DAYS / 8.0;
        let sixteenth = SYNODIC_PERIOD_DAYS / 16.0;

        assert_eq!(MoonPhase::from_age(0.0), MoonPhase::New);
        assert_eq!(MoonPhase::from_age(sixteenth - 1e-9), MoonPhase::New);
        assert_eq!(MoonPhase::from_age(sixteenth), MoonPhase::WaxingCrescent);
        assert_eq!(MoonPhase::from_age(2.0 * eighth), MoonPhase::FirstQuarter);
        assert_eq!(MoonPhase::from_age(4.0 * eighth), MoonPhase::Full);
        assert_eq!(MoonPhase::from_age(6.0 * eighth), MoonPhase::LastQuarter);
        assert_eq!(MoonPhase::from_age(SYNODIC_PERIOD_DAYS - sixteenth + 1e-9), MoonPhase::New);
        assert_eq!(MoonPhase::from_age(SYNODIC_PERIOD_DAYS - sixteenth - 1e-9), MoonPhase::WaningCrescent);
        assert_eq!(MoonPhase::from_age(SYNODIC_PERIOD_DAYS - 1e-9), MoonPhase::New);
    }

    #[test]
    fn new_moons_bracket_every_instant() {
        for t in sample_instants() {
            let next = next_new_moon(t).unwrap();
            let last = last_new_moon(t).unwrap();
            assert!(next > t, "{t}: next {next}");
            assert!(last <= t, "{t}: last {last}");
            assert!((next - last - period()).num_milliseconds().abs() <= 1, "{t}");
        }
    }

    #[test]
    fn full_moons_bracket_every_instant() {
        for t in sample_instants() {
            let next = next_full_moon(t).unwrap();
            let last = last_full_moon(t).unwrap();
            assert!(next > t && last <= t, "{t}: {last} .. {next}");
            assert!((next - last - period()).num_milliseconds().abs() <= 1, "{t}");
        }
    }

    #[test]
    fn new_moon_instant_rolls_to_the_following_cycle() {
        let t = epoch() + period();
        assert_eq!(last_new_moon(t).unwrap(), t);
        assert!(next_new_moon(t).unwrap() > t);
    }

    #[test]
    fn mean_lunations_land_near_observed_ones() {
        // Observed: new moon 2024-01-11 11:57Z, full moon 2024-01-25 17:54Z.
        let t = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 1, 11, 11, 57, 0).unwrap();
        let full = Utc.with_ymd_and_hms(2024, 1, 25, 17, 54, 0).unwrap();

        assert!((next_new_moon(t).unwrap() - new).num_hours().abs() < 24);
        assert!((next_full_moon(t).unwrap() - full).num_hours().abs() < 24);
    }

    #[test]
    fn distance_stays_within_model_bounds() {
        for t in sample_instants() {
            let d = distance_km(t).unwrap();
            assert!(
                (MEAN_DISTANCE_KM - DISTANCE_AMPLITUDE_KM..=MEAN_DISTANCE_KM + DISTANCE_AMPLITUDE_KM)
                    .contains(&d),
                "{t}: {d}"
            );
        }
    }

    #[test]
    fn same_instant_gives_identical_state() {
        for t in sample_instants().take(50) {
            let (a, b) = (MoonState::at(t).unwrap(), MoonState::at(t).unwrap());
            assert_eq!(a, b);
            assert_eq!(a.age.to_bits(), b.age.to_bits());
            assert_eq!(a.distance_km.to_bits(), b.distance_km.to_bits());
        }
    }

    #[test]
    fn unix_seconds_entry_point_matches_datetime() {
        let t = epoch() + days(3.25);
        let secs = t.timestamp() as f64 + f64::from(t.timestamp_subsec_millis()) / 1000.0;
        assert_eq!(MoonState::at_unix_seconds(secs).unwrap(), MoonState::at(t).unwrap());
    }

    #[test]
    fn non_finite_instants_are_rejected() {
        for secs in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                MoonState::at_unix_seconds(secs),
                Err(MoonError::InvalidInstant(_))
            ));
        }
    }

    #[test]
    fn out_of_range_instants_are_rejected() {
        assert!(matches!(instant_from_unix_seconds(1e15), Err(MoonError::InvalidInstant(_))));
        assert!(matches!(instant_from_unix_seconds(-1e12), Err(MoonError::InvalidInstant(_))));

        let far = Utc.with_ymd_and_hms(10_500, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(MoonState::at(far), Err(MoonError::InvalidInstant(_))));

        // In range itself, but the next new moon would not be.
        let edge = Utc.with_ymd_and_hms(9999, 12, 31, 12, 0, 0).unwrap();
        assert!(age(edge).is_ok());
        assert!(matches!(next_new_moon(edge), Err(MoonError::InvalidInstant(_))));
    }

    #[test]
    fn phase_serializes_as_label() {
        assert_eq!(serde_json::to_value(MoonPhase::WaningGibbous).unwrap(), "Waning Gibbous");
    }
}
