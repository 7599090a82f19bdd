use crate::domain::entities::{ConflictSnapshot, MediaAsset, QueueOperation, Record};
use crate::domain::value_objects::{
    EntityKind, MediaId, OperationType, OwnerRef, QueueId, RecordId, RecordPayload, SyncStatus,
    UploadStatus,
};
use crate::infrastructure::store::rows::{MediaAssetRow, QueueOperationRow, RecordRow};
use crate::shared::error::AppError;
use chrono::{DateTime, Utc};
use std::convert::TryInto;

pub fn record_from_row(row: RecordRow) -> Result<Record, AppError> {
    let id = RecordId::parse(&row.id).map_err(AppError::ValidationError)?;
    let owner_ref = OwnerRef::parse(&row.owner_ref).map_err(AppError::ValidationError)?;
    let parent_ref = row
        .parent_ref
        .map(|value| RecordId::new(value).map_err(AppError::ValidationError))
        .transpose()?;
    let payload = RecordPayload::from_json_str(&row.payload)
        .map_err(AppError::DeserializationError)?;
    let conflict = row
        .conflict_data
        .map(|json| {
            serde_json::from_str::<ConflictSnapshot>(&json)
                .map_err(|err| AppError::DeserializationError(err.to_string()))
        })
        .transpose()?;

    Ok(Record {
        id,
        owner_ref,
        parent_ref,
        payload,
        sync_status: SyncStatus::from(row.sync_status.as_str()),
        local_updated_at: millis_to_datetime(row.local_updated_at),
        server_updated_at: row.server_updated_at.map(millis_to_datetime),
        last_synced_at: row.last_synced_at.map(millis_to_datetime),
        is_deleted: row.is_deleted,
        conflict,
    })
}

pub fn media_asset_from_row(row: MediaAssetRow) -> Result<MediaAsset, AppError> {
    let id = MediaId::new(row.id).map_err(AppError::ValidationError)?;
    let parent_record_ref =
        RecordId::new(row.parent_record_ref).map_err(AppError::ValidationError)?;

    Ok(MediaAsset {
        id,
        local_path: row.local_path,
        server_url: row.server_url,
        parent_record_ref,
        upload_status: UploadStatus::from(row.upload_status.as_str()),
        file_size: try_i64_to_u64(row.file_size, "file_size")?,
        mime_type: row.mime_type,
        last_error: row.last_error,
        created_at: millis_to_datetime(row.created_at),
        uploaded_at: row.uploaded_at.map(millis_to_datetime),
    })
}

pub fn queue_operation_from_row(row: QueueOperationRow) -> Result<QueueOperation, AppError> {
    let id = QueueId::new(row.id).map_err(AppError::ValidationError)?;
    let operation_type =
        OperationType::parse(&row.operation_type).map_err(AppError::ValidationError)?;
    let entity_kind = EntityKind::parse(&row.entity_type).map_err(AppError::ValidationError)?;
    let payload = row
        .payload
        .map(|json| {
            serde_json::from_str(&json)
                .map_err(|err| AppError::DeserializationError(err.to_string()))
        })
        .transpose()?;

    Ok(QueueOperation {
        id,
        operation_type,
        entity_kind,
        entity_id: row.entity_id,
        payload,
        priority: row.priority as i32,
        retry_count: try_i64_to_u32(row.retry_count, "retry_count")?,
        max_retries: try_i64_to_u32(row.max_retries, "max_retries")?,
        last_error: row.last_error,
        created_at: millis_to_datetime(row.created_at),
        last_attempt_at: row.last_attempt_at.map(millis_to_datetime),
    })
}

pub fn record_payload_json(record: &Record) -> Result<String, AppError> {
    serde_json::to_string(&record.payload)
        .map_err(|err| AppError::SerializationError(err.to_string()))
}

pub fn conflict_data_json(record: &Record) -> Result<Option<String>, AppError> {
    record
        .conflict
        .as_ref()
        .map(|snapshot| {
            serde_json::to_string(snapshot)
                .map_err(|err| AppError::SerializationError(err.to_string()))
        })
        .transpose()
}

pub fn datetime_to_millis(value: DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

fn try_i64_to_u64(value: i64, label: &str) -> Result<u64, AppError> {
    value
        .try_into()
        .map_err(|_| AppError::ValidationError(format!("{label} cannot be negative")))
}

fn try_i64_to_u32(value: i64, label: &str) -> Result<u32, AppError> {
    value
        .try_into()
        .map_err(|_| AppError::ValidationError(format!("{label} cannot be negative")))
}
