//! InMemoryJourneyStore - 開発・テスト用の JourneyStore
//!
//! # 実装詳細
//! - SQL 版と同じ一意キーの意味論（journey.id, (journey_id, x, y)）
//! - 書き込み遅延と障害の注入ができる（worker のテスト用）

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Point, RouteKey};
use crate::ports::journey_store::{JourneyRecord, LocationRecord};
use crate::ports::{JourneyStore, StoreError};

#[derive(Default)]
struct Tables {
    journeys: BTreeMap<String, JourneyRecord>,
    locations: Vec<LocationRecord>,
    location_keys: HashSet<LocationRecord>,
}

#[derive(Default)]
pub struct InMemoryJourneyStore {
    tables: Mutex<Tables>,
    /// 残り何回の書き込みを失敗させるか
    pending_faults: AtomicUsize,
    write_delay: Option<Duration>,
    writes: AtomicUsize,
    closed: AtomicBool,
}

impl InMemoryJourneyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 各書き込みの前に `delay` だけ待つ
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// 次の `count` 回の書き込みを backend エラーにする
    pub fn fail_next_writes(&self, count: usize) {
        self.pending_faults.store(count, Ordering::SeqCst);
    }

    pub async fn journeys(&self) -> Vec<JourneyRecord> {
        self.tables.lock().await.journeys.values().cloned().collect()
    }

    pub async fn locations(&self) -> Vec<LocationRecord> {
        self.tables.lock().await.locations.clone()
    }

    /// 試行された書き込みの回数（失敗・重複を含む）
    pub fn write_attempts(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn before_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        let injected = self
            .pending_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable {
                reason: "injected fault".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl JourneyStore for InMemoryJourneyStore {
    async fn insert_journey(&self, route: RouteKey) -> Result<(), StoreError> {
        self.before_write().await?;
        let mut tables = self.tables.lock().await;
        let record = JourneyRecord::new(route);
        if tables.journeys.contains_key(&record.id) {
            return Err(StoreError::Duplicate);
        }
        tables.journeys.insert(record.id.clone(), record);
        Ok(())
    }

    async fn insert_location(&self, route: RouteKey, point: Point) -> Result<(), StoreError> {
        self.before_write().await?;
        let mut tables = self.tables.lock().await;
        let record = LocationRecord::new(route, point);
        if !tables.location_keys.insert(record.clone()) {
            return Err(StoreError::Duplicate);
        }
        tables.locations.push(record);
        Ok(())
    }

    async fn mark_completed(&self, route: RouteKey) -> Result<(), StoreError> {
        self.before_write().await?;
        let mut tables = self.tables.lock().await;
        let journey = tables
            .journeys
            .values_mut()
            .find(|j| j.origin == route.origin.get() && j.destination == route.destination.get())
            .ok_or_else(|| StoreError::MissingJourney {
                journey_id: route.journey_id(),
            })?;
        journey.completed = true;
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
