//! PersistenceWorker - イベントを永続化する唯一の書き込み手
//!
//! # フロー
//! 1. 停止シグナルを確認（来ていればループを抜ける）
//! 2. EventReceiver から次のイベントを待つ（停止シグナルと select で競合させる）
//! 3. イベントの種類ごとに JourneyStore を呼ぶ
//! 4. Duplicate は成功扱い、それ以外の障害はログに出してそのイベントを諦める
//!
//! # 停止手順
//! 停止シグナル受信 → 実行中のストレージ呼び出しが完了 → ループ終了
//! → JoinHandle 経由でストアを所有者に返す。キューに残ったイベントは破棄される。

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::RouteEvent;
use crate::ports::{JourneyStore, StoreError};
use crate::queue::EventReceiver;

/// 1 イベントを永続化した結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Persisted,
    /// 一意キーが既に存在した（再配送）
    AlreadyPersisted,
    /// ストレージ障害。リトライせずに諦めた
    Abandoned,
}

/// イベントを 1 件 store に適用する
pub async fn persist_event<S: JourneyStore + ?Sized>(store: &S, event: RouteEvent) -> PersistOutcome {
    let result = match event {
        RouteEvent::JourneyDiscovered { route } => store.insert_journey(route).await,
        RouteEvent::LocationDiscovered { route, point } => store.insert_location(route, point).await,
        RouteEvent::JourneyCompleted { route } => store.mark_completed(route).await,
    };

    match result {
        Ok(()) => {
            debug!(event = event.kind(), route = %event.route(), "event persisted");
            PersistOutcome::Persisted
        }
        Err(StoreError::Duplicate) => {
            debug!(event = event.kind(), route = %event.route(), "event already persisted");
            PersistOutcome::AlreadyPersisted
        }
        Err(err) => {
            error!(event = ?event, error = %err, "failed to persist event");
            PersistOutcome::Abandoned
        }
    }
}

/// PersistenceWorker はキューを 1 本のタスクで drain する
pub struct PersistenceWorker<S> {
    store: S,
    events: EventReceiver,
    shutdown_rx: watch::Receiver<bool>,
}

/// Worker handle.
/// - `request_shutdown()` で停止を依頼する
/// - `shutdown()` で停止を待ち、ストアを取り戻す
pub struct WorkerHandle<S> {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<S>,
}

impl<S: JourneyStore> PersistenceWorker<S> {
    /// Spawn the worker. It owns `store` and the only `EventReceiver`.
    pub fn spawn(store: S, events: EventReceiver) -> WorkerHandle<S> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = Self {
            store,
            events,
            shutdown_rx,
        };
        let join = tokio::spawn(worker.run());
        WorkerHandle { shutdown_tx, join }
    }

    async fn run(mut self) -> S {
        info!("persistence worker started");
        loop {
            if *self.shutdown_rx.borrow() {
                break;
            }

            // recv は待つ可能性があるので停止シグナルと競合させる
            let event = tokio::select! {
                biased;
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() {
                        // handle が drop された
                        break;
                    }
                    continue;
                }
                event = self.events.recv() => event,
            };

            let Some(event) = event else {
                info!("event queue closed by every producer");
                break;
            };
            persist_event(&self.store, event).await;
        }

        let discarded = self.events.pending();
        if discarded > 0 {
            warn!(discarded, "persistence worker stopped with unpersisted events");
        }
        info!("persistence worker stopped");
        self.store
    }
}

impl<S: Send + 'static> WorkerHandle<S> {
    /// Ask the worker to stop after its in-flight storage call.
    pub fn request_shutdown(&self) {
        // ignore send error: the worker may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the worker and wait for it, at most `deadline`.
    ///
    /// Returns the store on a clean stop. On overrun the task is aborted and
    /// `None` is returned; the caller continues teardown best-effort.
    pub async fn shutdown(self, deadline: Duration) -> Option<S> {
        self.request_shutdown();
        let abort = self.join.abort_handle();

        match tokio::time::timeout(deadline, self.join).await {
            Ok(Ok(store)) => Some(store),
            Ok(Err(err)) => {
                error!(error = %err, "persistence worker task failed");
                None
            }
            Err(_) => {
                warn!(?deadline, "persistence worker missed the shutdown deadline; aborting");
                abort.abort();
                None
            }
        }
    }
}
