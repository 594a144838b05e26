//! DeduplicationCache - アクターの旅とルートの正本（in-memory）
//!
//! # 学習ポイント
//! - 1 つの RwLock で check-then-mutate をアトミックにする
//! - 新規の遷移だけを RouteEvent としてキューに流す（write-behind）
//! - ロックを保持したまま enqueue するので、キュー上の順序 = 状態変更の順序
//!
//! # フロー
//! 1. write lock を取る
//! 2. 状態を検査・更新する
//! 3. 新規の遷移ならイベントを EventQueue に push（満杯なら待つ）

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::domain::{
    ActorId, ActorJourney, CacheError, LocationId, Point, Route, RouteEvent, RouteKey, RouteView,
};
use crate::ports::JourneyMetrics;
use crate::queue::EventQueue;

#[derive(Default)]
struct CacheState {
    /// アクターごとの現在の旅
    journeys: HashMap<ActorId, ActorJourney>,
    /// 既知の全ルート（削除されない）
    routes: BTreeMap<RouteKey, Route>,
}

impl CacheState {
    /// アクターの旅とルートを解決する。どちらかが無ければ NotFound。
    fn resolve_mut(&mut self, actor: &ActorId) -> Result<&mut Route, CacheError> {
        let Some(journey) = self.journeys.get(actor) else {
            let err = CacheError::NoActiveJourney {
                actor: actor.clone(),
            };
            warn!(%actor, "{err}");
            return Err(err);
        };

        let key = journey.route;
        self.routes.get_mut(&key).ok_or_else(|| {
            let err = CacheError::RouteNotFound { route: key };
            warn!(%actor, route = %key, "{err}");
            err
        })
    }
}

/// DeduplicationCache は受信したイベントが新規かどうかを判定し、新規なら下流に流す
///
/// # 使用例
/// ```ignore
/// cache.start_journey("c1".into(), LocationId::new(23), LocationId::new(42)).await;
/// cache.movement(&"c1".into(), Point::new(1, 2)).await?;
/// cache.reached_destination(&"c1".into(), LocationId::new(42)).await?;
/// ```
pub struct DeduplicationCache {
    state: RwLock<CacheState>,
    queue: EventQueue,
    metrics: Arc<dyn JourneyMetrics>,
}

impl DeduplicationCache {
    pub fn new(queue: EventQueue, metrics: Arc<dyn JourneyMetrics>) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            queue,
            metrics,
        }
    }

    /// アクターの旅を開始（既存の旅は上書き）
    ///
    /// ルートが未知なら作成して JourneyDiscovered を流す。失敗しない。
    pub async fn start_journey(&self, actor: ActorId, origin: LocationId, destination: LocationId) {
        let route = RouteKey::between(origin, destination);
        let mut state = self.state.write().await;

        state
            .journeys
            .insert(actor.clone(), ActorJourney::new(actor.clone(), route));

        if state.routes.contains_key(&route) {
            debug!(%actor, %route, "journey started on known route");
            return;
        }
        state.routes.insert(route, Route::new(route));
        debug!(%actor, %route, "route discovered");
        self.emit(RouteEvent::JourneyDiscovered { route }).await;
    }

    /// アクターの移動を記録
    ///
    /// 完了済みルート、または訪問済みの point は黙って無視する。
    pub async fn movement(&self, actor: &ActorId, point: Point) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        let route = state.resolve_mut(actor)?;

        if !route.visit(point) {
            return Ok(());
        }
        let route = route.key();
        self.emit(RouteEvent::LocationDiscovered { route, point }).await;
        Ok(())
    }

    /// アクターが目的地に到着した
    ///
    /// 冪等: 完了済みなら何もしない。初回だけメトリクスを数えて JourneyCompleted を流す。
    pub async fn reached_destination(
        &self,
        actor: &ActorId,
        destination: LocationId,
    ) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        let route = state.resolve_mut(actor)?;

        if route.key().destination != destination {
            warn!(%actor, route = %route.key(), %destination, "reported destination differs from active journey");
        }
        if !route.complete() {
            return Ok(());
        }
        let route = route.key();
        self.metrics.log_journey_completed();
        self.emit(RouteEvent::JourneyCompleted { route }).await;
        Ok(())
    }

    /// 全ルートのスナップショット（read lock のみ）
    pub async fn list_routes(&self) -> Vec<RouteView> {
        let state = self.state.read().await;
        state.routes.values().map(Route::view).collect()
    }

    /// アクターの現在の旅
    pub async fn active_journey(&self, actor: &ActorId) -> Option<ActorJourney> {
        self.state.read().await.journeys.get(actor).cloned()
    }

    /// ルートのコピー
    pub async fn route(&self, key: RouteKey) -> Option<Route> {
        self.state.read().await.routes.get(&key).cloned()
    }

    async fn emit(&self, event: RouteEvent) {
        if let Err(err) = self.queue.push(event).await {
            error!(event = event.kind(), route = %event.route(), "{err}");
            panic!(
                "{} for route {} emitted after the pipeline shut down: {err}",
                event.kind(),
                event.route()
            );
        }
    }
}
