use std::sync::Arc;

use tokio::sync::RwLock;

use super::{ReadingSource, StoreError};
use crate::{
    archive::window::TimeWindow,
    db::models::{Reading, TowerReading},
};

/// In-memory reading store.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Uses `tokio::sync::RwLock` so concurrent readers never block each other.
#[derive(Debug, Clone, Default)]
pub struct MemoryReadingStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    readings: Vec<Reading>,
    /// Kept in display order.
    towers: Vec<TowerReading>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a station reading.
    pub async fn insert(&self, reading: Reading) {
        self.inner.write().await.readings.push(reading);
    }

    /// Overwrite the latest reading of `tower.sensor`, or append the tower
    /// at the end of the display order if it is new.
    pub async fn update_tower(&self, tower: TowerReading) {
        let mut guard = self.inner.write().await;
        match guard.towers.iter_mut().find(|t| t.sensor == tower.sensor) {
            Some(existing) => *existing = tower,
            None => guard.towers.push(tower),
        }
    }
}

impl ReadingSource for MemoryReadingStore {
    async fn fetch_readings(&self, window: &TimeWindow) -> Result<Vec<Reading>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .readings
            .iter()
            .filter(|r| window.contains(r.recorded_at))
            .cloned()
            .collect())
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .readings
            .iter()
            .max_by_key(|r| r.recorded_at)
            .cloned())
    }

    async fn latest_tower_readings(&self) -> Result<Vec<TowerReading>, StoreError> {
        Ok(self.inner.read().await.towers.clone())
    }
}
