//! Windowed rollups over the station archive.

pub mod stats;
pub mod window;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::store::{ReadingSource, StoreError};

use self::{
    stats::{aggregate, WindowStats},
    window::{resolve, WindowKind},
};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive data unavailable: {0}")]
    DataUnavailable(#[from] StoreError),
    #[error("window {window} resolves to an inverted interval [{start}, {end})")]
    InvalidWindowDefinition {
        window: WindowKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("window {window} cannot be resolved on the station calendar at {now}")]
    CalendarOutOfRange { window: WindowKind, now: DateTime<Utc> },
    #[error("unknown archive window: {0:?}")]
    UnknownWindow(String),
}

/// The six rollups published together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveReport {
    pub yesterday: WindowStats,
    pub this_week: WindowStats,
    pub this_month: WindowStats,
    pub last_month: WindowStats,
    pub this_year: WindowStats,
    pub all_time: WindowStats,
}

/// Computes archive rollups for one request.
///
/// Holds only borrowed, immutable inputs: the reading source, the instant
/// every window is resolved against, and the station calendar.
pub struct ArchiveAggregator<'a, S> {
    source: &'a S,
    now: DateTime<Utc>,
    tz: Tz,
}

impl<'a, S: ReadingSource> ArchiveAggregator<'a, S> {
    pub fn new(source: &'a S, now: DateTime<Utc>, tz: Tz) -> Self {
        Self { source, now, tz }
    }

    /// Resolve `kind`, fetch its readings and reduce them. A window with no
    /// readings is a successful result in which every metric is `NoData`.
    pub async fn window(&self, kind: WindowKind) -> Result<WindowStats, ArchiveError> {
        let window = resolve(kind, self.now, self.tz)?;
        let readings = self.source.fetch_readings(&window).await?;
        Ok(aggregate(&readings))
    }

    pub async fn yesterday(&self) -> Result<WindowStats, ArchiveError> {
        self.window(WindowKind::Yesterday).await
    }

    pub async fn this_week(&self) -> Result<WindowStats, ArchiveError> {
        self.window(WindowKind::ThisWeek).await
    }

    pub async fn this_month(&self) -> Result<WindowStats, ArchiveError> {
        self.window(WindowKind::ThisMonth).await
    }

    pub async fn last_month(&self) -> Result<WindowStats, ArchiveError> {
        self.window(WindowKind::LastMonth).await
    }

    pub async fn this_year(&self) -> Result<WindowStats, ArchiveError> {
        self.window(WindowKind::ThisYear).await
    }

    pub async fn all_time(&self) -> Result<WindowStats, ArchiveError> {
        self.window(WindowKind::AllTime).await
    }

    /// All six windows, queried concurrently. The first failure wins and the
    /// remaining queries are dropped.
    pub async fn report(&self) -> Result<ArchiveReport, ArchiveError> {
        let (yesterday, this_week, this_month, last_month, this_year, all_time) = tokio::try_join!(
            self.yesterday(),
            self.this_week(),
            self.this_month(),
            self.last_month(),
            self.this_year(),
            self.all_time(),
        )?;

        Ok(ArchiveReport { yesterday, this_week, this_month, last_month, this_year, all_time })
    }
}
