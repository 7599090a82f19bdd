use crate::domain::value_objects::{MediaId, MediaRef, RecordId, UploadStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: MediaId,
    pub local_path: String,
    pub server_url: Option<String>,
    pub parent_record_ref: RecordId,
    pub upload_status: UploadStatus,
    pub file_size: u64,
    pub mime_type: String,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl MediaAsset {
    pub fn new(
        id: MediaId,
        local_path: String,
        parent_record_ref: RecordId,
        file_size: u64,
        mime_type: String,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            local_path,
            server_url: None,
            parent_record_ref,
            upload_status: UploadStatus::Pending,
            file_size,
            mime_type,
            last_error: None,
            created_at: at,
            uploaded_at: None,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.upload_status == UploadStatus::Uploaded
    }

    /// ペイロード内の写真参照として使われるローカルパス表現。
    pub fn local_ref(&self) -> MediaRef {
        MediaRef::new(self.local_path.clone()).expect("local path is never empty")
    }

    pub fn begin_upload(&mut self) {
        self.upload_status = UploadStatus::Uploading;
    }

    pub fn complete_upload(&mut self, server_url: String, at: DateTime<Utc>) {
        self.server_url = Some(server_url);
        self.upload_status = UploadStatus::Uploaded;
        self.uploaded_at = Some(at);
        self.last_error = None;
    }

    /// 失敗してもローカルファイルは消さない。次パスで再試行できる状態に戻す。
    pub fn fail_upload(&mut self, error: String) {
        self.upload_status = UploadStatus::Failed;
        self.last_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_asset() -> MediaAsset {
        MediaAsset::new(
            MediaId::generate(),
            "/data/media/p1.jpg".to_string(),
            RecordId::temporary(),
            1024,
            "image/jpeg".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn upload_lifecycle_transitions() {
        let mut asset = sample_asset();
        assert!(asset.upload_status.is_retryable());

        asset.begin_upload();
        assert_eq!(asset.upload_status, UploadStatus::Uploading);

        asset.complete_upload("https://cdn/p1.jpg".to_string(), Utc::now());
        assert!(asset.is_uploaded());
        assert_eq!(asset.server_url.as_deref(), Some("https://cdn/p1.jpg"));
        assert!(asset.last_error.is_none());
    }

    #[test]
    fn failed_upload_keeps_local_file_and_error() {
        let mut asset = sample_asset();
        asset.begin_upload();
        asset.fail_upload("timeout".to_string());
        assert_eq!(asset.upload_status, UploadStatus::Failed);
        assert!(asset.upload_status.is_retryable());
        assert_eq!(asset.last_error.as_deref(), Some("timeout"));
        assert_eq!(asset.local_path, "/data/media/p1.jpg");
    }
}
