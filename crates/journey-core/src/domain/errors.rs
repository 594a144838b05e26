//! Errors - キャッシュ操作のエラー
//!
//! どちらも呼び出し側に同期的に返される NotFound 系のエラー。
//! 入力順序の誤り（StartJourney 前の Movement など）を表し、リトライはしない。

use thiserror::Error;

use super::ids::{ActorId, RouteKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("no active journey for actor {actor}")]
    NoActiveJourney { actor: ActorId },

    #[error("missing route {route}")]
    RouteNotFound { route: RouteKey },
}

impl CacheError {
    /// NotFound 系かどうか（現状は全て）
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoActiveJourney { .. } | Self::RouteNotFound { .. }
        )
    }
}
