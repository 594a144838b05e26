//! JourneyStore port - 永続化の抽象化
//!
//! 永続化されるのは 2 つのテーブルだけ:
//! - `journey(id PRIMARY KEY, origin, destination, completed)`
//! - `location(journey_id, x, y, UNIQUE(journey_id, x, y))`
//!
//! # 実装
//! - **SqliteJourneyStore**: sqlx + SQLite（本番用）
//! - **InMemoryJourneyStore**: テスト・開発用

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Point, RouteKey};

/// StoreError はストレージ操作のエラー分類
///
/// Duplicate はエラー文字列ではなく型で判定する。
#[derive(Debug, Error)]
pub enum StoreError {
    /// 一意制約違反（再配送時に発生しうる。呼び出し側は成功として扱う）
    #[error("duplicate key")]
    Duplicate,

    /// 完了フラグの更新対象の journey 行が存在しない
    #[error("journey {journey_id} is not persisted")]
    MissingJourney { journey_id: String },

    /// sqlx を使うストアのバックエンドエラー
    #[error("storage backend error: {0}")]
    Backend(#[from] sqlx::Error),

    /// sqlx 以外のストアが書き込めなかった（接続断・注入された障害など）
    #[error("journey store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// journey テーブルの 1 行
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct JourneyRecord {
    pub id: String,
    pub origin: u16,
    pub destination: u16,
    pub completed: bool,
}

impl JourneyRecord {
    pub fn new(route: RouteKey) -> Self {
        Self {
            id: route.journey_id(),
            origin: route.origin.get(),
            destination: route.destination.get(),
            completed: false,
        }
    }
}

/// location テーブルの 1 行
#[derive(Debug, Clone, PartialEq, Eq, Hash, sqlx::FromRow)]
pub struct LocationRecord {
    pub journey_id: String,
    pub x: u16,
    pub y: u16,
}

impl LocationRecord {
    pub fn new(route: RouteKey, point: Point) -> Self {
        Self {
            journey_id: route.journey_id(),
            x: point.x,
            y: point.y,
        }
    }
}

/// JourneyStore は journey / location の永続化先
///
/// # 設計原則
/// - 書き込むのは PersistenceWorker だけ（ストレージ側のロックは不要）
/// - insert は一意キーで重複を検出し、`StoreError::Duplicate` を返す
#[async_trait]
pub trait JourneyStore: Send + Sync + 'static {
    /// journey 行を `o-d` をキーにして挿入
    async fn insert_journey(&self, route: RouteKey) -> Result<(), StoreError>;

    /// location 行を挿入（(journey_id, x, y) で一意）
    async fn insert_location(&self, route: RouteKey, point: Point) -> Result<(), StoreError>;

    /// (origin, destination) に一致する journey 行を完了にする
    async fn mark_completed(&self, route: RouteKey) -> Result<(), StoreError>;

    /// ストレージハンドルを解放
    async fn close(&self);
}

#[async_trait]
impl<T: JourneyStore + ?Sized> JourneyStore for std::sync::Arc<T> {
    async fn insert_journey(&self, route: RouteKey) -> Result<(), StoreError> {
        (**self).insert_journey(route).await
    }

    async fn insert_location(&self, route: RouteKey, point: Point) -> Result<(), StoreError> {
        (**self).insert_location(route, point).await
    }

    async fn mark_completed(&self, route: RouteKey) -> Result<(), StoreError> {
        (**self).mark_completed(route).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
