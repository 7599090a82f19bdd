use crate::application::ports::file_staging::{FileStaging, StagedFile};
use crate::shared::config::MediaConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 端末から渡されたファイルをエンジン管理下の耐久ディレクトリへ複製する。
/// OSの一時URIを直接参照し続けると回収されるため、参照前に必ずここを通す。
pub struct DiskFileStaging {
    media_dir: PathBuf,
    max_file_size: u64,
}

impl DiskFileStaging {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            media_dir: Path::new(&config.data_dir).join("media"),
            max_file_size: config.max_file_size,
        }
    }

    pub fn media_dir(&self) -> &Path {
        &self.media_dir
    }

    fn mime_for_extension(extension: &str) -> &'static str {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "heic" => "image/heic",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "mp4" => "video/mp4",
            "mov" => "video/quicktime",
            _ => "application/octet-stream",
        }
    }
}

#[async_trait]
impl FileStaging for DiskFileStaging {
    async fn stage(&self, source: &Path) -> Result<StagedFile, AppError> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|err| AppError::Storage(format!("Source not readable: {err}")))?;

        if !metadata.is_file() {
            return Err(AppError::ValidationError(format!(
                "Staging source is not a file: {}",
                source.display()
            )));
        }
        if metadata.len() > self.max_file_size {
            return Err(AppError::ValidationError(format!(
                "File exceeds the {} byte staging limit",
                self.max_file_size
            )));
        }

        tokio::fs::create_dir_all(&self.media_dir).await?;

        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin")
            .to_string();
        let file_name = format!("{}.{extension}", Uuid::new_v4());
        let destination = self.media_dir.join(&file_name);

        tokio::fs::copy(source, &destination).await?;

        Ok(StagedFile {
            path: destination.to_string_lossy().into_owned(),
            file_size: metadata.len(),
            mime_type: Self::mime_for_extension(&extension).to_string(),
        })
    }
}
