//! Events - キャッシュからストレージへ流れるイベント
//!
//! 閉じた enum なので worker 側の dispatch は網羅性がコンパイル時に検査される。

use serde::{Deserialize, Serialize};

use super::ids::RouteKey;
use super::route::Point;

/// RouteEvent はキャッシュで新規と判定された遷移
///
/// # イベント種類
/// - JourneyDiscovered: ルートの初回発見（ルートごとに最大 1 回）
/// - LocationDiscovered: ルート上の新しい point
/// - JourneyCompleted: ルートの初回完了（ルートごとに最大 1 回）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RouteEvent {
    JourneyDiscovered { route: RouteKey },
    LocationDiscovered { route: RouteKey, point: Point },
    JourneyCompleted { route: RouteKey },
}

impl RouteEvent {
    /// イベントが属するルート
    pub fn route(&self) -> RouteKey {
        match self {
            Self::JourneyDiscovered { route }
            | Self::LocationDiscovered { route, .. }
            | Self::JourneyCompleted { route } => *route,
        }
    }

    /// ログ用の短い名前
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JourneyDiscovered { .. } => "journey_discovered",
            Self::LocationDiscovered { .. } => "location_discovered",
            Self::JourneyCompleted { .. } => "journey_completed",
        }
    }
}
