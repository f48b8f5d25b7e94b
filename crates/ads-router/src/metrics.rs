//! Per-request metrics and periodic router snapshots.

use ads_session::SessionStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::provider::QueueStats;

const MAX_SNAPSHOTS: usize = 60;

/// One routed request, recorded on every exit path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMetric {
    pub timestamp: DateTime<Utc>,
    pub provider: String,
    pub model: String,
    pub session_id: String,
    pub agent_id: String,
    pub success: bool,
    /// Rejected by fair-share admission before dispatch.
    pub cooldown_hit: bool,
    /// Router entry to dispatch start.
    pub wait_ms: u64,
    /// Dispatch duration. 0 when never dispatched.
    pub exec_ms: u64,
    pub error: Option<String>,
}

/// Router-wide statistics captured by auto-snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouterStats {
    pub queue_stats: QueueStats,
    pub session_stats: SessionStats,
}

pub type StatsProvider = Arc<dyn Fn() -> RouterStats + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub stats: RouterStats,
}

pub trait MetricsCollector: Send + Sync {
    fn record_request(&self, entry: RequestMetric);
    /// Begin sampling `stats` periodically.
    fn start_auto_snapshot(&self, stats: StatsProvider);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricTotals {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub cooldown_hits: u64,
}

/// Bounded in-memory request log with aggregate counters.
pub struct InMemoryMetricsCollector {
    entries: Mutex<VecDeque<RequestMetric>>,
    totals: Mutex<MetricTotals>,
    max_entries: usize,
    snapshot_interval: Duration,
    snapshots: Arc<Mutex<VecDeque<StatsSnapshot>>>,
    snapshot_task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for InMemoryMetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMetricsCollector")
            .field("max_entries", &self.max_entries)
            .field("snapshot_interval", &self.snapshot_interval)
            .finish()
    }
}

impl InMemoryMetricsCollector {
    pub fn new(max_entries: usize, snapshot_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            totals: Mutex::new(MetricTotals::default()),
            max_entries: max_entries.max(1),
            snapshot_interval,
            snapshots: Arc::new(Mutex::new(VecDeque::new())),
            snapshot_task: Mutex::new(None),
        }
    }

    /// Most recent entries, oldest first.
    pub fn entries(&self) -> Vec<RequestMetric> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn totals(&self) -> MetricTotals {
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn latest_snapshot(&self) -> Option<StatsSnapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    /// Take one snapshot immediately.
    pub fn snapshot_now(&self, stats: &StatsProvider) {
        push_snapshot(&self.snapshots, stats());
    }
}

fn push_snapshot(snapshots: &Mutex<VecDeque<StatsSnapshot>>, stats: RouterStats) {
    let mut snapshots = snapshots.lock().unwrap_or_else(PoisonError::into_inner);
    if snapshots.len() == MAX_SNAPSHOTS {
        snapshots.pop_front();
    }
    snapshots.push_back(StatsSnapshot {
        taken_at: Utc::now(),
        stats,
    });
}

impl MetricsCollector for InMemoryMetricsCollector {
    fn record_request(&self, entry: RequestMetric) {
        {
            let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
            totals.requests += 1;
            if entry.cooldown_hit {
                totals.cooldown_hits += 1;
            } else if entry.success {
                totals.successes += 1;
            } else {
                totals.failures += 1;
            }
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() == self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn start_auto_snapshot(&self, stats: StatsProvider) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime; metrics auto-snapshot disabled");
            return;
        };
        let mut task = self
            .snapshot_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = task.take() {
            previous.abort();
        }
        let snapshots = Arc::clone(&self.snapshots);
        let period = self.snapshot_interval.max(Duration::from_millis(1));
        debug!(interval_ms = period.as_millis() as u64, "Starting metrics auto-snapshot");
        *task = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                push_snapshot(&snapshots, stats());
            }
        }));
    }
}

impl Drop for InMemoryMetricsCollector {
    fn drop(&mut self) {
        if let Some(task) = self
            .snapshot_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}
