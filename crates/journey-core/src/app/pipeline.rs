//! Pipeline - write-behind パイプラインの構築と停止
//!
//! # 構築順序
//! EventQueue → PersistenceWorker（store と receiver を所有）→ DeduplicationCache
//!
//! # 停止順序
//! 1. inbound 側が新しい呼び出しを止める（呼び出し側の責務）
//! 2. worker に停止を依頼し、期限付きで完了を待つ
//! 3. 返ってきた store を close
//! 4. queue を close（以後の push はライフサイクルのバグとして失敗する）

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use super::cache::DeduplicationCache;
use super::persistence_loop::{PersistenceWorker, WorkerHandle};
use crate::config::PipelineConfig;
use crate::impls::SqliteJourneyStore;
use crate::observability::QueueStats;
use crate::ports::{JourneyMetrics, JourneyStore, StoreError};
use crate::queue::EventQueue;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to open journey store: {0}")]
    Store(#[from] StoreError),
}

pub struct Pipeline<S> {
    cache: Arc<DeduplicationCache>,
    queue: EventQueue,
    worker: WorkerHandle<S>,
    shutdown_timeout: Duration,
}

impl Pipeline<SqliteJourneyStore> {
    /// `config.database_url` の SQLite に接続してパイプラインを起動
    pub async fn connect(
        config: &PipelineConfig,
        metrics: Arc<dyn JourneyMetrics>,
    ) -> Result<Self, PipelineError> {
        let store = SqliteJourneyStore::connect(&config.database_url).await?;
        Ok(Self::start(config, store, metrics))
    }
}

impl<S: JourneyStore> Pipeline<S> {
    /// Wire queue, worker and cache. Must be called inside a tokio runtime.
    pub fn start(config: &PipelineConfig, store: S, metrics: Arc<dyn JourneyMetrics>) -> Self {
        let (queue, events) = EventQueue::bounded(config.queue_capacity);
        let worker = PersistenceWorker::spawn(store, events);
        let cache = Arc::new(DeduplicationCache::new(queue.clone(), metrics));
        info!(capacity = config.queue_capacity.get(), "journey pipeline started");

        Self {
            cache,
            queue,
            worker,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// inbound 側に渡すキャッシュ
    pub fn cache(&self) -> Arc<DeduplicationCache> {
        Arc::clone(&self.cache)
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Wait until the worker has taken every queued event, at most `timeout`.
    ///
    /// 呼び出し側が inbound を止めた後に使う。`true` なら queue は空
    pub async fn drain(&self, timeout: Duration) -> bool {
        let emptied = tokio::time::timeout(timeout, async {
            while self.queue.stats().pending > 0 {
                tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
            }
        })
        .await
        .is_ok();

        if !emptied {
            warn!(
                pending = self.queue.stats().pending,
                ?timeout,
                "event queue not drained before the deadline"
            );
        }
        emptied
    }

    /// Ordered teardown. Returns `true` when the worker stopped within the deadline.
    pub async fn shutdown(self) -> bool {
        info!(pending = self.queue.stats().pending, "shutting down journey pipeline");

        let clean = match self.worker.shutdown(self.shutdown_timeout).await {
            Some(store) => {
                store.close().await;
                true
            }
            None => {
                warn!("journey store released without a clean worker stop");
                false
            }
        };

        self.queue.close();
        info!(clean, "journey pipeline stopped");
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActorId, LocationId, Point, RouteKey};
    use crate::impls::{AtomicJourneyMetrics, InMemoryJourneyStore};
    use async_trait::async_trait;
    use std::num::NonZeroUsize;
    use std::sync::{Mutex, OnceLock};

    fn config() -> PipelineConfig {
        PipelineConfig {
            queue_capacity: NonZeroUsize::new(16).unwrap(),
            shutdown_timeout: Duration::from_secs(5),
            ..PipelineConfig::default()
        }
    }

    /// close された瞬間に queue が閉じていたかを記録するストア
    #[derive(Default)]
    struct CloseOrderStore {
        queue: OnceLock<EventQueue>,
        queue_closed_at_store_close: Mutex<Option<bool>>,
    }

    #[async_trait]
    impl JourneyStore for CloseOrderStore {
        async fn insert_journey(&self, _route: RouteKey) -> Result<(), StoreError> {
            Ok(())
        }

        async fn insert_location(&self, _route: RouteKey, _point: Point) -> Result<(), StoreError> {
            Ok(())
        }

        async fn mark_completed(&self, _route: RouteKey) -> Result<(), StoreError> {
            Ok(())
        }

        async fn close(&self) {
            let closed = self.queue.get().map(EventQueue::is_closed);
            *self.queue_closed_at_store_close.lock().unwrap() = closed;
        }
    }

    #[tokio::test]
    async fn shutdown_closes_store_then_queue() {
        let store = Arc::new(CloseOrderStore::default());
        let pipeline = Pipeline::start(&config(), store.clone(), Arc::new(AtomicJourneyMetrics::new()));
        let queue = pipeline.queue.clone();
        store.queue.set(queue.clone()).unwrap();

        pipeline
            .cache()
            .start_journey(ActorId::from("c1"), LocationId::new(1), LocationId::new(2))
            .await;

        assert!(pipeline.shutdown().await);
        // store の close 時点では queue はまだ開いている
        assert_eq!(*store.queue_closed_at_store_close.lock().unwrap(), Some(false));
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn shutdown_releases_the_in_memory_store() {
        let store = Arc::new(InMemoryJourneyStore::new());
        let pipeline = Pipeline::start(&config(), store.clone(), Arc::new(AtomicJourneyMetrics::new()));

        assert!(pipeline.shutdown().await);
        assert!(store.is_closed());
    }

    #[tokio::test]
    async fn drain_then_shutdown_persists_every_event() {
        let store = Arc::new(InMemoryJourneyStore::new().with_write_delay(Duration::from_millis(2)));
        let pipeline = Pipeline::start(&config(), store.clone(), Arc::new(AtomicJourneyMetrics::new()));
        let cache = pipeline.cache();

        for origin in 0..20 {
            cache
                .start_journey(ActorId::from("c1"), LocationId::new(origin), LocationId::new(99))
                .await;
        }

        assert!(pipeline.drain(Duration::from_secs(5)).await);
        assert_eq!(pipeline.queue_stats().pending, 0);
        assert!(pipeline.shutdown().await);
        assert_eq!(store.journeys().await.len(), 20);
    }

    #[tokio::test]
    async fn drain_gives_up_at_the_deadline() {
        let store = Arc::new(InMemoryJourneyStore::new().with_write_delay(Duration::from_millis(200)));
        let pipeline = Pipeline::start(&config(), store.clone(), Arc::new(AtomicJourneyMetrics::new()));
        let cache = pipeline.cache();

        for origin in 0..5 {
            cache
                .start_journey(ActorId::from("c1"), LocationId::new(origin), LocationId::new(99))
                .await;
        }

        assert!(!pipeline.drain(Duration::from_millis(50)).await);
        assert!(pipeline.queue_stats().pending > 0);
        assert!(pipeline.shutdown().await);
    }

    #[tokio::test]
    #[should_panic(expected = "emitted after the pipeline shut down")]
    async fn cache_use_after_shutdown_panics() {
        let store = Arc::new(InMemoryJourneyStore::new());
        let pipeline = Pipeline::start(&config(), store, Arc::new(AtomicJourneyMetrics::new()));
        let cache = pipeline.cache();
        pipeline.shutdown().await;

        cache
            .start_journey(ActorId::from("late"), LocationId::new(1), LocationId::new(2))
            .await;
    }

    #[tokio::test]
    async fn movement_errors_do_not_reach_the_worker() {
        let store = Arc::new(InMemoryJourneyStore::new());
        let pipeline = Pipeline::start(&config(), store.clone(), Arc::new(AtomicJourneyMetrics::new()));
        let cache = pipeline.cache();

        let result = cache.movement(&ActorId::from("ghost"), Point::new(1, 2)).await;

        assert!(result.is_err());
        assert_eq!(pipeline.queue_stats().pending, 0);
        assert!(pipeline.shutdown().await);
        assert_eq!(store.write_attempts(), 0);
    }
}
