//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! パイプラインの外側にある協調者（ストレージ、メトリクス、時刻）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod journey_store;
pub mod metrics;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::journey_store::{JourneyRecord, JourneyStore, LocationRecord, StoreError};
pub use self::metrics::JourneyMetrics;
