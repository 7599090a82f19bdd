use crate::domain::value_objects::{OwnerRef, RecordId, RecordPayload, SyncStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 競合発生時に保持するリモート側スナップショット。手動解決の材料になる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSnapshot {
    pub remote_payload: RecordPayload,
    pub remote_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub owner_ref: OwnerRef,
    pub parent_ref: Option<RecordId>,
    pub payload: RecordPayload,
    pub sync_status: SyncStatus,
    pub local_updated_at: DateTime<Utc>,
    pub server_updated_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub conflict: Option<ConflictSnapshot>,
}

impl Record {
    pub fn new(
        id: RecordId,
        owner_ref: OwnerRef,
        parent_ref: Option<RecordId>,
        payload: RecordPayload,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_ref,
            parent_ref,
            payload,
            sync_status: SyncStatus::Pending,
            local_updated_at: at,
            server_updated_at: None,
            last_synced_at: None,
            is_deleted: false,
            conflict: None,
        }
    }

    /// 最終同期以降にローカル編集があるか。未同期レコードは常に true。
    pub fn has_pending_edit(&self) -> bool {
        match self.last_synced_at {
            Some(last) => self.local_updated_at > last,
            None => true,
        }
    }

    pub fn apply_local_edit(&mut self, payload: RecordPayload, at: DateTime<Utc>) {
        self.payload = payload;
        self.local_updated_at = at;
        self.sync_status = SyncStatus::Pending;
        self.conflict = None;
    }

    pub fn mark_synced(&mut self, server_updated_at: DateTime<Utc>, at: DateTime<Utc>) {
        self.sync_status = SyncStatus::Synced;
        self.server_updated_at = Some(server_updated_at);
        self.last_synced_at = Some(at);
        self.conflict = None;
    }

    /// スカラー送信は成功したが未解決メディア参照が残る状態。
    /// 同期時刻は進めつつ、参照が解決するまで `pending` に留まる。
    pub fn mark_partially_synced(&mut self, server_updated_at: DateTime<Utc>, at: DateTime<Utc>) {
        self.sync_status = SyncStatus::Pending;
        self.server_updated_at = Some(server_updated_at);
        self.last_synced_at = Some(at);
    }

    pub fn mark_conflict(&mut self, snapshot: Option<ConflictSnapshot>) {
        self.sync_status = SyncStatus::Conflict;
        self.conflict = snapshot;
    }

    pub fn adopt_remote(
        &mut self,
        payload: RecordPayload,
        remote_updated_at: DateTime<Utc>,
        at: DateTime<Utc>,
    ) {
        self.payload = payload;
        self.local_updated_at = at;
        self.mark_synced(remote_updated_at, at);
    }

    pub fn tombstone(&mut self, at: DateTime<Utc>) {
        self.is_deleted = true;
        self.local_updated_at = at;
    }
}
