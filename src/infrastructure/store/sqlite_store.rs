use crate::application::ports::local_store::LocalStore;
use crate::domain::entities::{MediaAsset, QueueOperation, QueueOperationDraft, Record};
use crate::domain::value_objects::{MediaId, OwnerRef, QueueId, RecordId};
use crate::infrastructure::store::mappers::{
    conflict_data_json, datetime_to_millis, media_asset_from_row, queue_operation_from_row,
    record_from_row, record_payload_json,
};
use crate::infrastructure::store::rows::{MediaAssetRow, QueueOperationRow, RecordRow};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteLocalStore {
    pool: Pool<Sqlite>,
}

impl SqliteLocalStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn upsert_record(&self, record: &Record) -> Result<(), AppError> {
        let payload = record_payload_json(record)?;
        let conflict_data = conflict_data_json(record)?;

        sqlx::query(
            r#"
            INSERT INTO records (
                id, owner_ref, parent_ref, payload, sync_status,
                local_updated_at, server_updated_at, last_synced_at,
                is_deleted, conflict_data
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                owner_ref = excluded.owner_ref,
                parent_ref = excluded.parent_ref,
                payload = excluded.payload,
                sync_status = excluded.sync_status,
                local_updated_at = excluded.local_updated_at,
                server_updated_at = excluded.server_updated_at,
                last_synced_at = excluded.last_synced_at,
                is_deleted = excluded.is_deleted,
                conflict_data = excluded.conflict_data
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.owner_ref.as_str())
        .bind(record.parent_ref.as_ref().map(|id| id.as_str().to_string()))
        .bind(&payload)
        .bind(record.sync_status.as_str())
        .bind(datetime_to_millis(record.local_updated_at))
        .bind(record.server_updated_at.map(datetime_to_millis))
        .bind(record.last_synced_at.map(datetime_to_millis))
        .bind(record.is_deleted)
        .bind(conflict_data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>, AppError> {
        let row = sqlx::query_as::<_, RecordRow>("SELECT * FROM records WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(record_from_row).transpose()
    }

    async fn list_records(&self, owner: &OwnerRef) -> Result<Vec<Record>, AppError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT * FROM records
            WHERE owner_ref = ?1 AND is_deleted = 0
            ORDER BY local_updated_at ASC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn list_child_records(&self, parent: &RecordId) -> Result<Vec<Record>, AppError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT * FROM records
            WHERE parent_ref = ?1
            ORDER BY local_updated_at ASC
            "#,
        )
        .bind(parent.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn list_conflicts(&self, owner: &OwnerRef) -> Result<Vec<Record>, AppError> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
            SELECT * FROM records
            WHERE owner_ref = ?1 AND sync_status = 'conflict' AND is_deleted = 0
            ORDER BY local_updated_at DESC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn tombstone(&self, id: &RecordId, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE records
            SET is_deleted = 1, local_updated_at = ?1
            WHERE id = ?2
            "#,
        )
        .bind(datetime_to_millis(at))
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM records WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn reconcile_id(&self, temp_id: &RecordId, server_id: &RecordId) -> Result<(), AppError> {
        if temp_id == server_id {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM records WHERE id = ?1")
            .bind(server_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        if existing.is_none() {
            // リネーム経路: 一時行をサーバーIDへ付け替える
            sqlx::query("UPDATE records SET id = ?1 WHERE id = ?2")
                .bind(server_id.as_str())
                .bind(temp_id.as_str())
                .execute(&mut *tx)
                .await?;
        } else {
            // 重複作成の吸収: 既存行を最新の書き込み内容で更新し、一時行を消す
            sqlx::query(
                r#"
                UPDATE records SET
                    payload = (SELECT payload FROM records WHERE id = ?2),
                    sync_status = (SELECT sync_status FROM records WHERE id = ?2),
                    local_updated_at = (SELECT local_updated_at FROM records WHERE id = ?2),
                    server_updated_at = (SELECT server_updated_at FROM records WHERE id = ?2),
                    last_synced_at = (SELECT last_synced_at FROM records WHERE id = ?2),
                    is_deleted = (SELECT is_deleted FROM records WHERE id = ?2)
                WHERE id = ?1
                "#,
            )
            .bind(server_id.as_str())
            .bind(temp_id.as_str())
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM records WHERE id = ?1")
                .bind(temp_id.as_str())
                .execute(&mut *tx)
                .await?;
        }

        // どちらの経路でも参照の付け替えは共通。宙に浮いた参照を残さない。
        sqlx::query("UPDATE media_assets SET parent_record_ref = ?1 WHERE parent_record_ref = ?2")
            .bind(server_id.as_str())
            .bind(temp_id.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE records SET parent_ref = ?1 WHERE parent_ref = ?2")
            .bind(server_id.as_str())
            .bind(temp_id.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE sync_queue SET entity_id = ?1 WHERE entity_id = ?2")
            .bind(server_id.as_str())
            .bind(temp_id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn enqueue(&self, draft: QueueOperationDraft) -> Result<QueueId, AppError> {
        let payload = draft
            .payload
            .as_ref()
            .map(|value| {
                serde_json::to_string(value)
                    .map_err(|err| AppError::SerializationError(err.to_string()))
            })
            .transpose()?;

        if draft.operation_type.coalesces() {
            let existing = sqlx::query(
                r#"
                SELECT id FROM sync_queue
                WHERE operation_type = ?1 AND entity_type = ?2 AND entity_id = ?3
                LIMIT 1
                "#,
            )
            .bind(draft.operation_type.as_str())
            .bind(draft.entity_kind.as_str())
            .bind(&draft.entity_id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = existing {
                let id: i64 = row.try_get("id")?;
                sqlx::query(
                    r#"
                    UPDATE sync_queue
                    SET payload = ?1, priority = ?2
                    WHERE id = ?3
                    "#,
                )
                .bind(&payload)
                .bind(draft.priority)
                .bind(id)
                .execute(&self.pool)
                .await?;

                return QueueId::new(id).map_err(AppError::ValidationError);
            }
        }

        let created_at = datetime_to_millis(Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO sync_queue (
                operation_type, entity_type, entity_id, payload,
                priority, retry_count, max_retries, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)
            "#,
        )
        .bind(draft.operation_type.as_str())
        .bind(draft.entity_kind.as_str())
        .bind(&draft.entity_id)
        .bind(&payload)
        .bind(draft.priority)
        .bind(draft.max_retries as i64)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        QueueId::new(result.last_insert_rowid()).map_err(AppError::ValidationError)
    }

    async fn dequeue_all(&self) -> Result<Vec<QueueOperation>, AppError> {
        let rows = sqlx::query_as::<_, QueueOperationRow>(
            r#"
            SELECT * FROM sync_queue
            ORDER BY priority DESC, created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(queue_operation_from_row).collect()
    }

    async fn remove_from_queue(&self, id: QueueId) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sync_queue WHERE id = ?1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove_operations_for_entity(&self, entity_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sync_queue WHERE entity_id = ?1")
            .bind(entity_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn has_operation_for(&self, entity_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM sync_queue WHERE entity_id = ?1")
            .bind(entity_id)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }

    async fn mark_attempt(
        &self,
        id: QueueId,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE sync_queue
            SET retry_count = retry_count + 1, last_error = ?1, last_attempt_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(error)
        .bind(datetime_to_millis(at))
        .bind(id.value())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_queued(&self) -> Result<u64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM sync_queue")
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }

    async fn upsert_media_asset(&self, asset: &MediaAsset) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO media_assets (
                id, local_path, server_url, parent_record_ref, upload_status,
                file_size, mime_type, last_error, created_at, uploaded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                local_path = excluded.local_path,
                server_url = excluded.server_url,
                parent_record_ref = excluded.parent_record_ref,
                upload_status = excluded.upload_status,
                file_size = excluded.file_size,
                mime_type = excluded.mime_type,
                last_error = excluded.last_error,
                uploaded_at = excluded.uploaded_at
            "#,
        )
        .bind(asset.id.as_str())
        .bind(&asset.local_path)
        .bind(&asset.server_url)
        .bind(asset.parent_record_ref.as_str())
        .bind(asset.upload_status.as_str())
        .bind(asset.file_size as i64)
        .bind(&asset.mime_type)
        .bind(&asset.last_error)
        .bind(datetime_to_millis(asset.created_at))
        .bind(asset.uploaded_at.map(datetime_to_millis))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_media_asset(&self, id: &MediaId) -> Result<Option<MediaAsset>, AppError> {
        let row = sqlx::query_as::<_, MediaAssetRow>("SELECT * FROM media_assets WHERE id = ?1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(media_asset_from_row).transpose()
    }

    async fn list_media_assets(&self, parent: &RecordId) -> Result<Vec<MediaAsset>, AppError> {
        let rows = sqlx::query_as::<_, MediaAssetRow>(
            r#"
            SELECT * FROM media_assets
            WHERE parent_record_ref = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(parent.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(media_asset_from_row).collect()
    }

    async fn list_pending_uploads(&self) -> Result<Vec<MediaAsset>, AppError> {
        let rows = sqlx::query_as::<_, MediaAssetRow>(
            r#"
            SELECT * FROM media_assets
            WHERE upload_status IN ('pending', 'failed')
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(media_asset_from_row).collect()
    }

    async fn reset_stuck_uploads(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE media_assets SET upload_status = 'pending' WHERE upload_status = 'uploading'",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
