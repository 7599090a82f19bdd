use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcomeStatus {
    Success,
    Failure,
    Skipped,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncPassMetricsSnapshot {
    pub total_success: u64,
    pub total_failure: u64,
    pub total_skipped: u64,
    pub consecutive_failure: u64,
    pub last_success_ms: Option<u64>,
    pub last_failure_ms: Option<u64>,
    pub last_outcome: Option<PassOutcomeStatus>,
    pub last_trigger: Option<String>,
    pub last_duration_ms: Option<u64>,
    pub last_pushed: Option<u32>,
    pub last_pulled: Option<u32>,
    pub last_failed: Option<u32>,
}

#[derive(Default, Clone)]
struct LastPassMetadata {
    last_outcome: Option<PassOutcomeStatus>,
    trigger: Option<String>,
    duration_ms: Option<u64>,
    pushed: Option<u32>,
    pulled: Option<u32>,
    failed: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct PassOutcomeMetadata {
    pub trigger: Option<String>,
    pub duration_ms: Option<u64>,
    pub pushed: Option<u32>,
    pub pulled: Option<u32>,
    pub failed: Option<u32>,
}

struct SyncPassMetrics {
    success: AtomicU64,
    failure: AtomicU64,
    skipped: AtomicU64,
    consecutive_failure: AtomicU64,
    last_success_ms: AtomicU64,
    last_failure_ms: AtomicU64,
    metadata: Mutex<LastPassMetadata>,
}

impl SyncPassMetrics {
    fn new() -> Self {
        Self {
            success: AtomicU64::new(0),
            failure: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            consecutive_failure: AtomicU64::new(0),
            last_success_ms: AtomicU64::new(0),
            last_failure_ms: AtomicU64::new(0),
            metadata: Mutex::new(LastPassMetadata::default()),
        }
    }

    fn record(&self, status: PassOutcomeStatus, meta: &PassOutcomeMetadata) {
        match status {
            PassOutcomeStatus::Success => {
                self.success.fetch_add(1, Ordering::Relaxed);
                self.last_success_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failure.store(0, Ordering::Relaxed);
            }
            PassOutcomeStatus::Failure => {
                self.failure.fetch_add(1, Ordering::Relaxed);
                self.last_failure_ms
                    .store(current_unix_ms(), Ordering::Relaxed);
                self.consecutive_failure.fetch_add(1, Ordering::Relaxed);
            }
            PassOutcomeStatus::Skipped => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
        }

        if let Ok(mut guard) = self.metadata.lock() {
            guard.last_outcome = Some(status);
            guard.trigger = meta.trigger.clone();
            guard.duration_ms = meta.duration_ms;
            guard.pushed = meta.pushed;
            guard.pulled = meta.pulled;
            guard.failed = meta.failed;
        }
    }

    fn snapshot(&self) -> SyncPassMetricsSnapshot {
        let metadata = self
            .metadata
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();

        SyncPassMetricsSnapshot {
            total_success: self.success.load(Ordering::Relaxed),
            total_failure: self.failure.load(Ordering::Relaxed),
            total_skipped: self.skipped.load(Ordering::Relaxed),
            consecutive_failure: self.consecutive_failure.load(Ordering::Relaxed),
            last_success_ms: to_option(self.last_success_ms.load(Ordering::Relaxed)),
            last_failure_ms: to_option(self.last_failure_ms.load(Ordering::Relaxed)),
            last_outcome: metadata.last_outcome,
            last_trigger: metadata.trigger,
            last_duration_ms: metadata.duration_ms,
            last_pushed: metadata.pushed,
            last_pulled: metadata.pulled,
            last_failed: metadata.failed,
        }
    }
}

fn to_option(value: u64) -> Option<u64> {
    if value == 0 { None } else { Some(value) }
}

fn current_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

static SYNC_PASS_METRICS: LazyLock<SyncPassMetrics> = LazyLock::new(SyncPassMetrics::new);

pub fn record_pass(status: PassOutcomeStatus, metadata: &PassOutcomeMetadata) {
    SYNC_PASS_METRICS.record(status, metadata);
}

pub fn snapshot() -> SyncPassMetricsSnapshot {
    SYNC_PASS_METRICS.snapshot()
}
