use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecordRow {
    pub id: String,
    pub owner_ref: String,
    pub parent_ref: Option<String>,
    pub payload: String,
    pub sync_status: String,
    pub local_updated_at: i64,
    pub server_updated_at: Option<i64>,
    pub last_synced_at: Option<i64>,
    pub is_deleted: bool,
    pub conflict_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MediaAssetRow {
    pub id: String,
    pub local_path: String,
    pub server_url: Option<String>,
    pub parent_record_ref: String,
    pub upload_status: String,
    pub file_size: i64,
    pub mime_type: String,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub uploaded_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueueOperationRow {
    pub id: i64,
    pub operation_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: Option<String>,
    pub priority: i64,
    pub retry_count: i64,
    pub max_retries: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub last_attempt_at: Option<i64>,
}
