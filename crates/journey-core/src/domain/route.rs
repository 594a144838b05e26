//! Route - ルートの集約と訪問済みポイント
//!
//! # 不変条件
//! - visited points に重複はない
//! - completed が true になった後は point を追加しない
//! - completed は一度だけ false -> true に遷移する

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ids::{ActorId, RouteKey};

/// Point はルート上の 2D 座標（値型、等価比較）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

impl Point {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// ActorJourney はアクターの現在の旅
///
/// アクターごとに 1 つだけ。StartJourney のたびに上書きされる（マージしない）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorJourney {
    pub actor: ActorId,
    pub route: RouteKey,
}

impl ActorJourney {
    pub fn new(actor: ActorId, route: RouteKey) -> Self {
        Self { actor, route }
    }
}

/// Route は同じ (origin, destination) を持つ全ての旅の重複排除済み集約
#[derive(Debug, Clone)]
pub struct Route {
    key: RouteKey,
    points: Vec<Point>,
    seen: HashSet<Point>,
    completed: bool,
}

impl Route {
    pub fn new(key: RouteKey) -> Self {
        Self {
            key,
            points: Vec::new(),
            seen: HashSet::new(),
            completed: false,
        }
    }

    pub fn key(&self) -> RouteKey {
        self.key
    }

    /// 訪問順に並んだポイント
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// point を記録する。新規に追加された場合のみ true。
    ///
    /// completed 済み、または既に訪問済みの point は無視される。
    pub fn visit(&mut self, point: Point) -> bool {
        if self.completed || !self.seen.insert(point) {
            return false;
        }
        self.points.push(point);
        true
    }

    /// ルートを完了にする。初回の完了時のみ true。
    pub fn complete(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        true
    }

    /// 外部に返すためのスナップショットを作成
    pub fn view(&self) -> RouteView {
        RouteView {
            id: self.key.to_string(),
            data: self.points.clone(),
        }
    }
}

/// RouteView はルート一覧の要素（`{"id": "o->d", "data": [...]}`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteView {
    pub id: String,
    pub data: Vec<Point>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_ignores_duplicate_points() {
        let mut route = Route::new(RouteKey::new(23, 42));

        assert!(route.visit(Point::new(1, 2)));
        assert!(!route.visit(Point::new(1, 2)));
        assert!(route.visit(Point::new(2, 2)));

        assert_eq!(route.points(), &[Point::new(1, 2), Point::new(2, 2)]);
    }

    #[test]
    fn completed_route_rejects_new_points() {
        let mut route = Route::new(RouteKey::new(23, 42));
        route.visit(Point::new(1, 2));

        assert!(route.complete());
        assert!(!route.visit(Point::new(3, 3)));
        assert_eq!(route.points(), &[Point::new(1, 2)]);
    }

    #[test]
    fn complete_is_one_shot() {
        let mut route = Route::new(RouteKey::new(23, 42));
        assert!(route.complete());
        assert!(!route.complete());
        assert!(route.is_completed());
    }

    #[test]
    fn view_serializes_like_listing_element() {
        let mut route = Route::new(RouteKey::new(42, 23));
        route.visit(Point::new(1, 2));

        let json = serde_json::to_value(route.view()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": "42->23", "data": [{ "x": 1, "y": 2 }] })
        );
    }
}
