//! Domain identifiers (strongly-typed IDs).
//!
//! # ID の種類
//! - **ActorId**: 移動を追跡される外部エンティティ（プレイヤーなど）の ID
//! - **LocationId**: 出発地・目的地を表す u16 の ID
//! - **RouteKey**: (origin, destination) の順序付きペア。(A,B) と (B,A) は別ルート
//!
//! ## なぜ newtype にするのか？
//! - ActorId と任意の String を混同できない
//! - origin/destination を取り違えても RouteKey の生成箇所で気付ける

use serde::{Deserialize, Serialize};
use std::fmt;

/// ActorId はアクター（キャラクター）の識別子
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// LocationId は出発地・目的地の識別子
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(u16);

impl LocationId {
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl From<u16> for LocationId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RouteKey は (origin, destination) の順序付きペア
///
/// # 表現
/// - Display: `"23->42"`（ルート一覧の id）
/// - `journey_id()`: `"23-42"`（永続化される journey 行の主キー）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub origin: LocationId,
    pub destination: LocationId,
}

impl RouteKey {
    pub const fn new(origin: u16, destination: u16) -> Self {
        Self::between(LocationId::new(origin), LocationId::new(destination))
    }

    pub const fn between(origin: LocationId, destination: LocationId) -> Self {
        Self {
            origin,
            destination,
        }
    }

    /// 永続化用の決定的な journey id（`o-d`）
    pub fn journey_id(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.origin, self.destination)
    }
}
