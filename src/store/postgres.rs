use sqlx::PgPool;

use super::{ReadingSource, StoreError};
use crate::{
    archive::window::TimeWindow,
    db::models::{ArchiveRow, Reading, TowerReading},
};

#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReadingSource for PgReadingStore {
    async fn fetch_readings(&self, window: &TimeWindow) -> Result<Vec<Reading>, StoreError> {
        let rows = sqlx::query_as::<_, ArchiveRow>(
            r#"
            SELECT id, sensor_id, recorded_at,
                   temp_f, dewpt_f, rel_h, pressure_inhg, wind_speed_mph, rain_in,
                   rainfall_in, wind_dir
            FROM archive
            WHERE ($1::timestamptz IS NULL OR recorded_at >= $1)
              AND recorded_at < $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn latest_reading(&self) -> Result<Option<Reading>, StoreError> {
        let row = sqlx::query_as::<_, ArchiveRow>(
            r#"
            SELECT id, sensor_id, recorded_at,
                   temp_f, dewpt_f, rel_h, pressure_inhg, wind_speed_mph, rain_in,
                   rainfall_in, wind_dir
            FROM archive
            ORDER BY recorded_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn latest_tower_readings(&self) -> Result<Vec<TowerReading>, StoreError> {
        let rows = sqlx::query_as::<_, TowerReading>(
            r#"
            SELECT t.sensor, t.name, d.temp_f, d.rel_h, d.recorded_at
            FROM towers t
            JOIN LATERAL (
                SELECT temp_f, rel_h, recorded_at
                FROM tower_data
                WHERE sensor = t.sensor
                ORDER BY recorded_at DESC
                LIMIT 1
            ) d ON TRUE
            ORDER BY t.arrange, t.sensor
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use sqlx::PgPool;

    use super::*;
    use crate::db::models::Metric;

    async fn insert_archive(pool: &PgPool, at: chrono::DateTime<Utc>, temp_f: Option<f64>) {
        sqlx::query("INSERT INTO archive (sensor_id, recorded_at, temp_f) VALUES ($1, $2, $3)")
            .bind("00001234")
            .bind(at)
            .bind(temp_f)
            .execute(pool)
            .await
            .unwrap();
    }

    fn at(h: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, 0, 0).unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn fetch_readings_respects_half_open_window(pool: PgPool) {
        insert_archive(&pool, at(1), Some(50.0)).await;
        insert_archive(&pool, at(2), Some(51.0)).await;
        insert_archive(&pool, at(3), Some(52.0)).await;

        let store = PgReadingStore::new(pool);
        let window = TimeWindow { start: Some(at(1)), end: at(3) };
        let readings = store.fetch_readings(&window).await.unwrap();

        assert_eq!(readings.len(), 2);
        assert!(readings.iter().all(|r| r.recorded_at < at(3)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn fetch_readings_unbounded_start(pool: PgPool) {
        insert_archive(&pool, at(1) - Duration::days(3650), Some(10.0)).await;
        insert_archive(&pool, at(1), None).await;

        let store = PgReadingStore::new(pool);
        let window = TimeWindow { start: None, end: at(4) };
        let readings = store.fetch_readings(&window).await.unwrap();

        assert_eq!(readings.len(), 2);
        let without_temp = readings.iter().find(|r| r.recorded_at == at(1)).unwrap();
        assert_eq!(without_temp.get(Metric::Temperature), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn fetch_readings_carries_rainfall_and_wind_direction(pool: PgPool) {
        sqlx::query(
            "INSERT INTO archive (sensor_id, recorded_at, wind_speed_mph, wind_dir, rainfall_in) \
             VALUES ($1, $2, 12.0, 225, 0.05)",
        )
        .bind("00001234")
        .bind(at(2))
        .execute(&pool)
        .await
        .unwrap();

        let store = PgReadingStore::new(pool);
        let window = TimeWindow { start: None, end: at(4) };
        let readings = store.fetch_readings(&window).await.unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].get(Metric::Rainfall), Some(0.05));
        assert_eq!(readings[0].wind_direction, Some(225));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn latest_reading_returns_most_recent(pool: PgPool) {
        insert_archive(&pool, at(1), Some(50.0)).await;
        insert_archive(&pool, at(5), Some(55.0)).await;

        let store = PgReadingStore::new(pool);
        let latest = store.latest_reading().await.unwrap().unwrap();
        assert_eq!(latest.recorded_at, at(5));
        assert_eq!(latest.get(Metric::Temperature), Some(55.0));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn latest_tower_readings_one_per_tower_in_order(pool: PgPool) {
        sqlx::query("INSERT INTO towers (sensor, name, arrange) VALUES ('b', 'Garage', 2), ('a', 'Porch', 1)")
            .execute(&pool)
            .await
            .unwrap();
        for (sensor, h, t) in [("a", 1, 40.0), ("a", 2, 41.0), ("b", 1, 60.0)] {
            sqlx::query("INSERT INTO tower_data (sensor, recorded_at, temp_f, rel_h) VALUES ($1, $2, $3, 50.0)")
                .bind(sensor)
                .bind(at(h))
                .bind(t)
                .execute(&pool)
                .await
                .unwrap();
        }

        let store = PgReadingStore::new(pool);
        let towers = store.latest_tower_readings().await.unwrap();
        assert_eq!(towers.len(), 2);
        assert_eq!(towers[0].name, "Porch");
        assert_eq!(towers[0].temp_f, Some(41.0));
        assert_eq!(towers[1].name, "Garage");
    }
}
