use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Uploaded,
    Failed,
    Unknown(String),
}

impl UploadStatus {
    pub fn as_str(&self) -> &str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::Failed => "failed",
            UploadStatus::Unknown(value) => value.as_str(),
        }
    }

    /// 次のパスでアップロード対象になる状態か。
    pub fn is_retryable(&self) -> bool {
        matches!(self, UploadStatus::Pending | UploadStatus::Failed)
    }
}

impl From<&str> for UploadStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending" => UploadStatus::Pending,
            "uploading" => UploadStatus::Uploading,
            "uploaded" => UploadStatus::Uploaded,
            "failed" => UploadStatus::Failed,
            other => UploadStatus::Unknown(other.to_string()),
        }
    }
}
