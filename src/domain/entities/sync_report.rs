use crate::domain::value_objects::SyncTrigger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 1回の同期パスの結果。スキップ・オフライン時はゼロワークで返る。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub trigger: SyncTrigger,
    pub executed: bool,
    pub offline: bool,
    pub auth_required: bool,
    pub media_uploaded: u32,
    pub media_failed: u32,
    pub pushed: u32,
    pub push_failed: u32,
    pub pulled: u32,
    pub tombstoned: u32,
    pub conflicts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn new(trigger: SyncTrigger, started_at: DateTime<Utc>) -> Self {
        Self {
            trigger,
            executed: true,
            offline: false,
            auth_required: false,
            media_uploaded: 0,
            media_failed: 0,
            pushed: 0,
            push_failed: 0,
            pulled: 0,
            tombstoned: 0,
            conflicts: 0,
            started_at,
            finished_at: None,
        }
    }

    /// 既にパスが進行中だったときのゼロワーク結果。
    pub fn skipped(trigger: SyncTrigger, at: DateTime<Utc>) -> Self {
        Self {
            executed: false,
            finished_at: Some(at),
            ..Self::new(trigger, at)
        }
    }

    /// オフラインでパスを開始できなかったときのゼロワーク結果。
    pub fn offline(trigger: SyncTrigger, at: DateTime<Utc>) -> Self {
        Self {
            executed: false,
            offline: true,
            finished_at: Some(at),
            ..Self::new(trigger, at)
        }
    }

    pub fn total_work(&self) -> u32 {
        self.media_uploaded + self.pushed + self.pulled + self.tombstoned
    }
}
