//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **SqliteJourneyStore**: sqlx + SQLite の永続化（本番用）
//! - **InMemoryJourneyStore**: 開発・テスト用の永続化
//! - **AtomicJourneyMetrics**: atomic カウンタのメトリクス

pub mod inmem_store;
pub mod metrics;
pub mod sqlite_store;

// 主要な型を再エクスポート
pub use self::inmem_store::InMemoryJourneyStore;
pub use self::metrics::AtomicJourneyMetrics;
pub use self::sqlite_store::SqliteJourneyStore;
