//! App - アプリケーション層
//!
//! このモジュールは、ports と queue を組み合わせて write-behind パイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **DeduplicationCache**: 新規の遷移だけをイベントにする in-memory の正本
//! - **PersistenceWorker**: キューを drain してストアに書く唯一の書き込み手
//! - **Pipeline**: 構築と順序付きの停止

pub mod cache;
pub mod persistence_loop;
pub mod pipeline;

// 主要な型を再エクスポート
pub use self::cache::DeduplicationCache;
pub use self::persistence_loop::{PersistOutcome, PersistenceWorker, WorkerHandle, persist_event};
pub use self::pipeline::{Pipeline, PipelineError};
