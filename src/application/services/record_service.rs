use crate::application::ports::local_store::LocalStore;
use crate::domain::conflict::Resolution;
use crate::domain::entities::{QueueOperationDraft, Record};
use crate::domain::value_objects::{EntityKind, OwnerRef, RecordId, RecordPayload, SyncStatus};
use crate::shared::error::AppError;
use chrono::Utc;
use std::sync::Arc;

/// UI層からの書き込み入口。ローカル保存とキュー投入を常に対で行う。
pub struct RecordService {
    store: Arc<dyn LocalStore>,
    max_retries: u32,
}

impl RecordService {
    pub fn new(store: Arc<dyn LocalStore>, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    pub async fn create_record(
        &self,
        owner: OwnerRef,
        parent_ref: Option<RecordId>,
        payload: RecordPayload,
    ) -> Result<Record, AppError> {
        if payload.kind() == EntityKind::Inspection && parent_ref.is_some() {
            return Err(AppError::ValidationError(
                "Inspection records cannot have a parent".to_string(),
            ));
        }

        let record = Record::new(
            RecordId::temporary(),
            owner,
            parent_ref,
            payload,
            Utc::now(),
        );

        self.store.upsert_record(&record).await?;
        self.store
            .enqueue(
                QueueOperationDraft::create(&record, self.max_retries)
                    .map_err(AppError::SerializationError)?,
            )
            .await?;

        tracing::debug!(
            target: "sync::records",
            record_id = %record.id,
            kind = %record.payload.kind(),
            "record created offline"
        );

        Ok(record)
    }

    pub async fn update_record(
        &self,
        id: &RecordId,
        payload: RecordPayload,
    ) -> Result<Record, AppError> {
        let mut record = self.require_record(id).await?;

        if record.sync_status == SyncStatus::Conflict {
            return Err(AppError::ValidationError(
                "Record is in conflict; resolve it before editing".to_string(),
            ));
        }
        if record.is_deleted {
            return Err(AppError::ValidationError(
                "Record has been deleted".to_string(),
            ));
        }
        if record.payload.kind() != payload.kind() {
            return Err(AppError::ValidationError(
                "Record kind cannot change on update".to_string(),
            ));
        }

        record.apply_local_edit(payload, Utc::now());
        self.store.upsert_record(&record).await?;
        self.enqueue_push(&record).await?;

        Ok(record)
    }

    /// ローカル削除。未作成レコードはリモートに存在しないため、その場で消すだけでよい。
    pub async fn delete_record(&self, id: &RecordId) -> Result<(), AppError> {
        let record = self.require_record(id).await?;

        self.store
            .remove_operations_for_entity(record.id.as_str())
            .await?;

        if record.id.is_local() {
            self.store.delete_record(&record.id).await?;
            return Ok(());
        }

        self.store.tombstone(&record.id, Utc::now()).await?;
        self.store
            .enqueue(QueueOperationDraft::delete(
                &record.id,
                record.payload.kind(),
                self.max_retries,
            ))
            .await?;

        Ok(())
    }

    pub async fn finalize_inspection(&self, id: &RecordId) -> Result<Record, AppError> {
        let mut record = self.require_record(id).await?;

        if record.payload.kind() != EntityKind::Inspection {
            return Err(AppError::ValidationError(
                "Only inspections can be finalized".to_string(),
            ));
        }
        if record.sync_status == SyncStatus::Conflict {
            return Err(AppError::ValidationError(
                "Record is in conflict; resolve it before finalizing".to_string(),
            ));
        }

        let mut payload = record.payload.clone();
        payload.finalize();
        record.apply_local_edit(payload, Utc::now());

        self.store.upsert_record(&record).await?;
        self.store
            .enqueue(
                QueueOperationDraft::finalize_parent(&record, self.max_retries)
                    .map_err(AppError::SerializationError)?,
            )
            .await?;

        Ok(record)
    }

    /// 競合の明示的な解決。`conflict` はここを通るまで終端状態に留まる。
    pub async fn resolve_conflict(
        &self,
        id: &RecordId,
        resolution: Resolution,
    ) -> Result<Record, AppError> {
        let mut record = self.require_record(id).await?;

        if record.sync_status != SyncStatus::Conflict {
            return Err(AppError::ValidationError(
                "Record is not in conflict".to_string(),
            ));
        }

        match resolution {
            Resolution::KeepLocal => {
                let payload = record.payload.clone();
                record.apply_local_edit(payload, Utc::now());
                self.store.upsert_record(&record).await?;
                self.enqueue_push(&record).await?;
            }
            Resolution::KeepServer => {
                let snapshot = record.conflict.clone().ok_or_else(|| {
                    AppError::ValidationError(
                        "No remote snapshot available; run a sync pass first".to_string(),
                    )
                })?;
                record.adopt_remote(
                    snapshot.remote_payload,
                    snapshot.remote_updated_at,
                    Utc::now(),
                );
                self.store.upsert_record(&record).await?;
                self.store
                    .remove_operations_for_entity(record.id.as_str())
                    .await?;
            }
            Resolution::Merge { payload } => {
                record.apply_local_edit(payload, Utc::now());
                self.store.upsert_record(&record).await?;
                self.enqueue_push(&record).await?;
            }
        }

        Ok(record)
    }

    pub async fn get_record(&self, id: &RecordId) -> Result<Option<Record>, AppError> {
        self.store.get_record(id).await
    }

    pub async fn list_records(&self, owner: &OwnerRef) -> Result<Vec<Record>, AppError> {
        self.store.list_records(owner).await
    }

    pub async fn list_conflicts(&self, owner: &OwnerRef) -> Result<Vec<Record>, AppError> {
        self.store.list_conflicts(owner).await
    }

    async fn require_record(&self, id: &RecordId) -> Result<Record, AppError> {
        self.store
            .get_record(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Record {id} does not exist")))
    }

    /// 未作成レコードは create、作成済みは update として積み直す。
    async fn enqueue_push(&self, record: &Record) -> Result<(), AppError> {
        let draft = if record.id.is_local() {
            QueueOperationDraft::create(record, self.max_retries)
                .map_err(AppError::SerializationError)?
        } else {
            QueueOperationDraft::update(record, self.max_retries)
                .map_err(AppError::SerializationError)?
        };
        self.store.enqueue(draft).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ConflictSnapshot;
    use crate::domain::value_objects::OperationType;
    use crate::infrastructure::store::SqliteLocalStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_service() -> (RecordService, Arc<dyn LocalStore>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let store: Arc<dyn LocalStore> = Arc::new(SqliteLocalStore::new(pool));
        (RecordService::new(store.clone(), 3), store)
    }

    fn owner() -> OwnerRef {
        OwnerRef::parse("user_1").unwrap()
    }

    #[tokio::test]
    async fn create_record_persists_and_enqueues() {
        let (service, store) = setup_service().await;

        let record = service
            .create_record(owner(), None, RecordPayload::inspection("Site A"))
            .await
            .unwrap();

        assert!(record.id.is_local());
        assert_eq!(record.sync_status, SyncStatus::Pending);

        let ops = store.dequeue_all().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation_type, OperationType::Create);
        assert_eq!(ops[0].entity_id, record.id.to_string());
    }

    #[tokio::test]
    async fn inspection_with_parent_is_rejected() {
        let (service, _) = setup_service().await;

        let result = service
            .create_record(
                owner(),
                Some(RecordId::parse("srv_1").unwrap()),
                RecordPayload::inspection("Nested"),
            )
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn two_updates_coalesce_into_latest_payload() {
        let (service, store) = setup_service().await;

        let record = service
            .create_record(owner(), None, RecordPayload::inspection("v1"))
            .await
            .unwrap();
        // create + update + update = create と合流済み update の2件
        service
            .update_record(&record.id, RecordPayload::inspection("v2"))
            .await
            .unwrap();
        service
            .update_record(&record.id, RecordPayload::inspection("v3"))
            .await
            .unwrap();

        let ops = store.dequeue_all().await.unwrap();
        assert_eq!(ops.len(), 2);
        let update = ops
            .iter()
            .find(|op| op.operation_type == OperationType::Update)
            .unwrap();
        assert_eq!(
            update
                .payload
                .as_ref()
                .and_then(|p| p.get("title"))
                .and_then(|v| v.as_str()),
            Some("v3")
        );
    }

    #[tokio::test]
    async fn deleting_local_only_record_leaves_no_trace() {
        let (service, store) = setup_service().await;

        let record = service
            .create_record(owner(), None, RecordPayload::inspection("draft"))
            .await
            .unwrap();
        service.delete_record(&record.id).await.unwrap();

        assert!(store.get_record(&record.id).await.unwrap().is_none());
        assert_eq!(store.count_queued().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_synced_record_tombstones_and_enqueues_delete() {
        let (service, store) = setup_service().await;

        let id = RecordId::parse("srv_9").unwrap();
        let mut record = Record::new(
            id.clone(),
            owner(),
            None,
            RecordPayload::inspection("Site"),
            Utc::now(),
        );
        record.mark_synced(Utc::now(), Utc::now());
        store.upsert_record(&record).await.unwrap();

        service.delete_record(&id).await.unwrap();

        let tombstoned = store.get_record(&id).await.unwrap().unwrap();
        assert!(tombstoned.is_deleted);

        let ops = store.dequeue_all().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation_type, OperationType::Delete);
    }

    #[tokio::test]
    async fn conflicted_record_rejects_plain_updates() {
        let (service, store) = setup_service().await;

        let record = service
            .create_record(owner(), None, RecordPayload::inspection("v1"))
            .await
            .unwrap();
        let mut conflicted = store.get_record(&record.id).await.unwrap().unwrap();
        conflicted.mark_conflict(None);
        store.upsert_record(&conflicted).await.unwrap();

        let result = service
            .update_record(&record.id, RecordPayload::inspection("v2"))
            .await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn resolve_keep_server_adopts_remote_snapshot() {
        let (service, store) = setup_service().await;

        let id = RecordId::parse("srv_1").unwrap();
        let mut record = Record::new(
            id.clone(),
            owner(),
            None,
            RecordPayload::inspection("local edit"),
            Utc::now(),
        );
        record.mark_conflict(Some(ConflictSnapshot {
            remote_payload: RecordPayload::inspection("remote version"),
            remote_updated_at: Utc::now(),
        }));
        store.upsert_record(&record).await.unwrap();

        let resolved = service
            .resolve_conflict(&id, Resolution::KeepServer)
            .await
            .unwrap();

        assert_eq!(resolved.sync_status, SyncStatus::Synced);
        assert_eq!(resolved.payload, RecordPayload::inspection("remote version"));
        assert_eq!(store.count_queued().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn resolve_keep_local_requeues_push() {
        let (service, store) = setup_service().await;

        let id = RecordId::parse("srv_2").unwrap();
        let mut record = Record::new(
            id.clone(),
            owner(),
            None,
            RecordPayload::inspection("local edit"),
            Utc::now(),
        );
        record.mark_conflict(None);
        store.upsert_record(&record).await.unwrap();

        let resolved = service
            .resolve_conflict(&id, Resolution::KeepLocal)
            .await
            .unwrap();

        assert_eq!(resolved.sync_status, SyncStatus::Pending);
        let ops = store.dequeue_all().await.unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].operation_type, OperationType::Update);
    }

    #[tokio::test]
    async fn resolve_merge_counts_as_new_local_edit() {
        let (service, store) = setup_service().await;

        let id = RecordId::parse("srv_3").unwrap();
        let mut record = Record::new(
            id.clone(),
            owner(),
            None,
            RecordPayload::inspection("local"),
            Utc::now(),
        );
        record.mark_conflict(None);
        store.upsert_record(&record).await.unwrap();

        let resolved = service
            .resolve_conflict(
                &id,
                Resolution::Merge {
                    payload: RecordPayload::inspection("merged"),
                },
            )
            .await
            .unwrap();

        assert_eq!(resolved.sync_status, SyncStatus::Pending);
        assert_eq!(resolved.payload, RecordPayload::inspection("merged"));
        assert!(resolved.has_pending_edit());
    }

    #[tokio::test]
    async fn finalize_marks_payload_and_enqueues_finalize_op() {
        let (service, store) = setup_service().await;

        let record = service
            .create_record(owner(), None, RecordPayload::inspection("Site"))
            .await
            .unwrap();
        let finalized = service.finalize_inspection(&record.id).await.unwrap();

        assert!(finalized.payload.is_finalized());
        let ops = store.dequeue_all().await.unwrap();
        assert!(ops
            .iter()
            .any(|op| op.operation_type == OperationType::FinalizeParent));
    }
}
