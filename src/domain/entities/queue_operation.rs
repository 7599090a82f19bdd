use crate::domain::entities::{MediaAsset, Record};
use crate::domain::value_objects::{EntityKind, OperationType, QueueId, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PRIORITY: i32 = 0;

/// キューへ積む前の操作。IDと再試行カウンタは永続化時に確定する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueOperationDraft {
    pub operation_type: OperationType,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub payload: Option<Value>,
    pub priority: i32,
    pub max_retries: u32,
}

impl QueueOperationDraft {
    pub fn create(record: &Record, max_retries: u32) -> Result<Self, String> {
        Ok(Self {
            operation_type: OperationType::Create,
            entity_kind: record.payload.kind(),
            entity_id: record.id.to_string(),
            payload: Some(record.payload.to_value()?),
            priority: DEFAULT_PRIORITY,
            max_retries,
        })
    }

    pub fn update(record: &Record, max_retries: u32) -> Result<Self, String> {
        Ok(Self {
            operation_type: OperationType::Update,
            entity_kind: record.payload.kind(),
            entity_id: record.id.to_string(),
            payload: Some(record.payload.to_value()?),
            priority: DEFAULT_PRIORITY,
            max_retries,
        })
    }

    pub fn delete(id: &RecordId, kind: EntityKind, max_retries: u32) -> Self {
        Self {
            operation_type: OperationType::Delete,
            entity_kind: kind,
            entity_id: id.to_string(),
            payload: None,
            priority: DEFAULT_PRIORITY,
            max_retries,
        }
    }

    pub fn upload_media(asset: &MediaAsset, max_retries: u32) -> Self {
        Self {
            operation_type: OperationType::UploadMedia,
            entity_kind: EntityKind::Media,
            entity_id: asset.id.to_string(),
            payload: None,
            priority: DEFAULT_PRIORITY,
            max_retries,
        }
    }

    pub fn finalize_parent(record: &Record, max_retries: u32) -> Result<Self, String> {
        Ok(Self {
            operation_type: OperationType::FinalizeParent,
            entity_kind: record.payload.kind(),
            entity_id: record.id.to_string(),
            payload: Some(record.payload.to_value()?),
            priority: DEFAULT_PRIORITY,
            max_retries,
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueOperation {
    pub id: QueueId,
    pub operation_type: OperationType,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub payload: Option<Value>,
    pub priority: i32,
    pub retry_count: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl QueueOperation {
    pub fn record_id(&self) -> Result<RecordId, String> {
        RecordId::parse(&self.entity_id)
    }

    /// 次の失敗で再試行上限に達するか。
    pub fn is_last_attempt(&self) -> bool {
        self.retry_count + 1 >= self.max_retries
    }
}
