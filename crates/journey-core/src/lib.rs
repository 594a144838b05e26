//! journey-core
//!
//! Write-behind pipeline for tracking actor movement across routes.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, route, events, errors）
//! - **ports**: 抽象化レイヤー（JourneyStore, JourneyMetrics, Clock）
//! - **queue**: キャッシュとストレージをつなぐ有界 FIFO キュー
//! - **app**: DeduplicationCache, PersistenceWorker, Pipeline
//! - **impls**: 実装（SQLite, InMemory, atomic メトリクス）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

pub use app::{DeduplicationCache, Pipeline, PipelineError};
pub use config::{ConfigError, PipelineConfig};
