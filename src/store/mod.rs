//! Read-only access to persisted station readings.
//!
//! The archive and the request orchestrator only ever see the
//! [`ReadingSource`] trait. Postgres backs it in production; the in-memory
//! store backs tests and local demos.

pub mod memory;
pub mod postgres;

use std::future::Future;

use thiserror::Error;

use crate::{
    archive::window::TimeWindow,
    db::models::{Reading, TowerReading},
};

pub use memory::MemoryReadingStore;
pub use postgres::PgReadingStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Source of station readings.
///
/// Implementations must tolerate concurrent calls from independent requests
/// and must not hold any lock across calls.
pub trait ReadingSource: Send + Sync {
    /// All station readings with `window.start <= recorded_at < window.end`.
    /// An unbounded start means "since the first reading". Order is
    /// unspecified.
    fn fetch_readings(
        &self,
        window: &TimeWindow,
    ) -> impl Future<Output = Result<Vec<Reading>, StoreError>> + Send;

    /// The most recent station reading, if any has been recorded.
    fn latest_reading(&self) -> impl Future<Output = Result<Option<Reading>, StoreError>> + Send;

    /// Latest reading for every configured tower, in display order.
    fn latest_tower_readings(
        &self,
    ) -> impl Future<Output = Result<Vec<TowerReading>, StoreError>> + Send;
}

/// The concrete store handed to the HTTP layer as shared state.
#[derive(Debug, Clone)]
pub enum Store {
    Postgres(PgReadingStore),
    Memory(MemoryReadingStore),
}

impl ReadingSource for Store {
    async fn fetch_readings(&self, window: &TimeWindow) -> Result<Vec<Reading>, StoreError> {
        match self {
            Store::Postgres(s) => s.fetch_readings(window).await,
            Store::Memory(s) => s.fetch_readings(window).await,
        }
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StoreError> {
        match self {
            Store::Postgres(s) => s.latest_reading().await,
            Store::Memory(s) => s.latest_reading().await,
        }
    }

    async fn latest_tower_readings(&self) -> Result<Vec<TowerReading>, StoreError> {
        match self {
            Store::Postgres(s) => s.latest_tower_readings().await,
            Store::Memory(s) => s.latest_tower_readings().await,
        }
    }
}
