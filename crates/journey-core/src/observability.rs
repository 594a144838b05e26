use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of the event queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub capacity: usize,
}

/// Point-in-time view of the journey counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub completed_journeys: u64,
    pub running_since: DateTime<Utc>,
    pub requests_per_sec: f64,
}
