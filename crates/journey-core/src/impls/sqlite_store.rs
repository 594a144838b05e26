//! SqliteJourneyStore - sqlx + SQLite による JourneyStore
//!
//! # 学習ポイント
//! - 一意制約違反を `DatabaseError::is_unique_violation()` で型として判定する
//!   （エラーメッセージの文字列比較はしない）
//! - `sqlite::memory:` は接続ごとに別 DB なので、プールは 1 接続に固定する

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use crate::domain::{Point, RouteKey};
use crate::ports::journey_store::{JourneyRecord, LocationRecord};
use crate::ports::{JourneyStore, StoreError};

const CREATE_JOURNEY_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS journey (
        id TEXT PRIMARY KEY NOT NULL,
        origin INTEGER NOT NULL,
        destination INTEGER NOT NULL,
        completed BOOLEAN NOT NULL DEFAULT 0
    )
";

const CREATE_LOCATION_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS location (
        journey_id TEXT NOT NULL,
        x INTEGER NOT NULL,
        y INTEGER NOT NULL,
        UNIQUE (journey_id, x, y)
    )
";

pub struct SqliteJourneyStore {
    pool: SqlitePool,
}

impl SqliteJourneyStore {
    /// `url` に接続し、テーブルが無ければ作成する
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        info!(url, "journey store ready");
        Ok(store)
    }

    async fn init(&self) -> Result<(), StoreError> {
        for statement in [CREATE_JOURNEY_SQL, CREATE_LOCATION_SQL] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn journeys(&self) -> Result<Vec<JourneyRecord>, StoreError> {
        let rows = sqlx::query_as::<_, JourneyRecord>(
            "SELECT id, origin, destination, completed FROM journey ORDER BY origin, destination",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn locations(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let rows = sqlx::query_as::<_, LocationRecord>(
            "SELECT journey_id, x, y FROM location ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// 一意制約違反だけを Duplicate に分類する
fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate,
        _ => StoreError::Backend(err),
    }
}

#[async_trait]
impl JourneyStore for SqliteJourneyStore {
    async fn insert_journey(&self, route: RouteKey) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO journey (id, origin, destination, completed) VALUES (?1, ?2, ?3, 0)",
        )
        .bind(route.journey_id())
        .bind(route.origin.get())
        .bind(route.destination.get())
        .execute(&self.pool)
        .await
        .map_err(classify)?;
        Ok(())
    }

    async fn insert_location(&self, route: RouteKey, point: Point) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO location (journey_id, x, y) VALUES (?1, ?2, ?3)")
            .bind(route.journey_id())
            .bind(point.x)
            .bind(point.y)
            .execute(&self.pool)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn mark_completed(&self, route: RouteKey) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE journey SET completed = 1 WHERE origin = ?1 AND destination = ?2")
                .bind(route.origin.get())
                .bind(route.destination.get())
                .execute(&self.pool)
                .await
                .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingJourney {
                journey_id: route.journey_id(),
            });
        }
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("journey store closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteJourneyStore {
        SqliteJourneyStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn tables_start_empty() {
        let store = memory_store().await;
        assert!(store.journeys().await.unwrap().is_empty());
        assert!(store.locations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_journey_uses_deterministic_id() {
        let store = memory_store().await;
        store.insert_journey(RouteKey::new(23, 42)).await.unwrap();

        assert_eq!(
            store.journeys().await.unwrap(),
            vec![JourneyRecord {
                id: "23-42".to_string(),
                origin: 23,
                destination: 42,
                completed: false,
            }]
        );
    }

    #[tokio::test]
    async fn duplicate_journey_is_classified() {
        let store = memory_store().await;
        let route = RouteKey::new(23, 42);
        store.insert_journey(route).await.unwrap();

        let err = store.insert_journey(route).await.unwrap_err();
        assert!(err.is_duplicate(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn duplicate_location_is_classified() {
        let store = memory_store().await;
        let route = RouteKey::new(23, 42);
        store.insert_journey(route).await.unwrap();
        store.insert_location(route, Point::new(1, 2)).await.unwrap();

        let err = store
            .insert_location(route, Point::new(1, 2))
            .await
            .unwrap_err();
        assert!(err.is_duplicate(), "unexpected error: {err}");

        // 同じ座標でも別ルートなら別の行
        store
            .insert_location(RouteKey::new(42, 23), Point::new(1, 2))
            .await
            .unwrap();
        assert_eq!(store.locations().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn mark_completed_updates_matching_row() {
        let store = memory_store().await;
        store.insert_journey(RouteKey::new(23, 42)).await.unwrap();
        store.insert_journey(RouteKey::new(42, 23)).await.unwrap();

        store.mark_completed(RouteKey::new(23, 42)).await.unwrap();

        let journeys = store.journeys().await.unwrap();
        let completed: Vec<_> = journeys.iter().filter(|j| j.completed).map(|j| j.id.as_str()).collect();
        assert_eq!(completed, vec!["23-42"]);
    }

    #[tokio::test]
    async fn mark_completed_without_row_is_reported() {
        let store = memory_store().await;
        let err = store.mark_completed(RouteKey::new(1, 2)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingJourney { .. }));
    }
}
