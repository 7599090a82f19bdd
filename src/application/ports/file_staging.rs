use crate::shared::error::AppError;
use async_trait::async_trait;
use std::path::Path;

/// 耐久ストレージへ複製されたファイルの情報。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: String,
    pub file_size: u64,
    pub mime_type: String,
}

/// 端末の一時URIを参照し続けないための複製層。
#[async_trait]
pub trait FileStaging: Send + Sync {
    async fn stage(&self, source: &Path) -> Result<StagedFile, AppError>;
}
