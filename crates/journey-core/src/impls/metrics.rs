//! AtomicJourneyMetrics - atomic カウンタによる JourneyMetrics 実装
//!
//! # 学習ポイント
//! - `AtomicU64` による lock-free なカウント
//! - Clock を差し替えて稼働時間の計算をテスト可能にする

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::observability::MetricsSnapshot;
use crate::ports::{Clock, JourneyMetrics, SystemClock};

pub struct AtomicJourneyMetrics<C = SystemClock> {
    requests: AtomicU64,
    completed_journeys: AtomicU64,
    running_since: DateTime<Utc>,
    clock: C,
}

impl AtomicJourneyMetrics<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for AtomicJourneyMetrics<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> AtomicJourneyMetrics<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            requests: AtomicU64::new(0),
            completed_journeys: AtomicU64::new(0),
            running_since: clock.now(),
            clock,
        }
    }

    /// 現在のカウンタと稼働時間からスナップショットを作成
    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let elapsed = (self.clock.now() - self.running_since)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();
        let requests_per_sec = if elapsed > 0.0 {
            requests as f64 / elapsed
        } else {
            0.0
        };

        MetricsSnapshot {
            requests,
            completed_journeys: self.completed_journeys.load(Ordering::Relaxed),
            running_since: self.running_since,
            requests_per_sec,
        }
    }
}

impl<C: Clock> JourneyMetrics for AtomicJourneyMetrics<C> {
    fn log_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn log_journey_completed(&self) {
        self.completed_journeys.fetch_add(1, Ordering::Relaxed);
    }
}
