use crate::domain::entities::{MediaAsset, QueueOperation, QueueOperationDraft, Record};
use crate::domain::value_objects::{MediaId, OwnerRef, QueueId, RecordId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// ローカル永続化の契約。レコード・メディア資産・同期キューの3領域を扱う。
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn upsert_record(&self, record: &Record) -> Result<(), AppError>;
    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>, AppError>;
    /// 生存レコード（墓標以外）を所有者スコープで返す。
    async fn list_records(&self, owner: &OwnerRef) -> Result<Vec<Record>, AppError>;
    async fn list_child_records(&self, parent: &RecordId) -> Result<Vec<Record>, AppError>;
    async fn list_conflicts(&self, owner: &OwnerRef) -> Result<Vec<Record>, AppError>;
    async fn tombstone(&self, id: &RecordId, at: DateTime<Utc>) -> Result<(), AppError>;
    /// 双方で削除が確定した墓標の物理削除。
    async fn delete_record(&self, id: &RecordId) -> Result<(), AppError>;
    /// 一時IDからサーバー発行IDへの付け替え。単一トランザクションで実行される。
    async fn reconcile_id(&self, temp_id: &RecordId, server_id: &RecordId) -> Result<(), AppError>;

    /// `update` 操作は同一エンティティ宛の既存 `update` に合流し、ペイロードを置き換える。
    async fn enqueue(&self, draft: QueueOperationDraft) -> Result<QueueId, AppError>;
    /// 優先度降順、同順位は作成時刻昇順。
    async fn dequeue_all(&self) -> Result<Vec<QueueOperation>, AppError>;
    async fn remove_from_queue(&self, id: QueueId) -> Result<(), AppError>;
    async fn remove_operations_for_entity(&self, entity_id: &str) -> Result<u64, AppError>;
    async fn has_operation_for(&self, entity_id: &str) -> Result<bool, AppError>;
    /// 試行の記録: retry_count を加算し、エラーと試行時刻を残す。
    async fn mark_attempt(
        &self,
        id: QueueId,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;
    async fn count_queued(&self) -> Result<u64, AppError>;

    async fn upsert_media_asset(&self, asset: &MediaAsset) -> Result<(), AppError>;
    async fn get_media_asset(&self, id: &MediaId) -> Result<Option<MediaAsset>, AppError>;
    async fn list_media_assets(&self, parent: &RecordId) -> Result<Vec<MediaAsset>, AppError>;
    /// `pending` / `failed` の資産。次パスのアップロード対象。
    async fn list_pending_uploads(&self) -> Result<Vec<MediaAsset>, AppError>;
    /// クラッシュで `uploading` のまま取り残された資産を再試行対象へ戻す。
    async fn reset_stuck_uploads(&self) -> Result<u64, AppError>;
}
