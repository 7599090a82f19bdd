use crate::application::ports::file_staging::FileStaging;
use crate::application::ports::local_store::LocalStore;
use crate::application::ports::remote_gateway::{FailureClass, RemoteError, RemoteGateway};
use crate::domain::entities::{MediaAsset, QueueOperationDraft};
use crate::domain::value_objects::{MediaId, MediaRef, RecordId, RecordPayload};
use crate::shared::error::AppError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;

/// 1回のアップロード一括処理の結果。`outcomes` は資産ごとの成否を保持する。
#[derive(Debug, Clone, Default)]
pub struct MediaBatchReport {
    pub uploaded: u32,
    pub failed: u32,
    pub auth_failure: bool,
    pub outcomes: Vec<(MediaId, Option<RemoteError>)>,
}

/// メディアパイプライン。ステージング・アップロード・参照解決を担い、
/// レコード本体の同期からは独立して動く。
pub struct MediaService {
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn RemoteGateway>,
    staging: Arc<dyn FileStaging>,
    concurrency: usize,
    max_retries: u32,
}

impl MediaService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        staging: Arc<dyn FileStaging>,
        concurrency: usize,
        max_retries: u32,
    ) -> Self {
        Self {
            store,
            gateway,
            staging,
            concurrency: concurrency.max(1),
            max_retries,
        }
    }

    /// 一時URIを耐久ストレージへ複製してから資産として登録する。
    pub async fn stage(&self, source: &Path, parent: &RecordId) -> Result<MediaAsset, AppError> {
        self.store
            .get_record(parent)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Record {parent} does not exist")))?;

        let staged = self.staging.stage(source).await?;
        let asset = MediaAsset::new(
            MediaId::generate(),
            staged.path,
            parent.clone(),
            staged.file_size,
            staged.mime_type,
            Utc::now(),
        );

        self.store.upsert_media_asset(&asset).await?;
        self.store
            .enqueue(QueueOperationDraft::upload_media(&asset, self.max_retries))
            .await?;

        tracing::debug!(
            target: "sync::media",
            media_id = %asset.id,
            parent = %parent,
            "media asset staged"
        );

        Ok(asset)
    }

    /// 冪等なアップロード。完了済みなら何もせず返し、失敗してもローカルファイルは残す。
    pub async fn upload(
        &self,
        mut asset: MediaAsset,
    ) -> Result<(MediaAsset, Option<RemoteError>), AppError> {
        if asset.is_uploaded() {
            return Ok((asset, None));
        }

        asset.begin_upload();
        self.store.upsert_media_asset(&asset).await?;

        match self.gateway.upload_media(&asset).await {
            Ok(server_url) => {
                asset.complete_upload(server_url, Utc::now());
                self.store.upsert_media_asset(&asset).await?;
                Ok((asset, None))
            }
            Err(err) => {
                asset.fail_upload(err.to_string());
                self.store.upsert_media_asset(&asset).await?;
                tracing::warn!(
                    target: "sync::media",
                    media_id = %asset.id,
                    error = %err,
                    "media upload failed"
                );
                Ok((asset, Some(err)))
            }
        }
    }

    /// `pending` / `failed` の資産を有界並列でアップロードする。1件の失敗は他を妨げない。
    pub async fn upload_pending(&self) -> Result<MediaBatchReport, AppError> {
        let assets = self.store.list_pending_uploads().await?;
        if assets.is_empty() {
            return Ok(MediaBatchReport::default());
        }

        let outcomes: Vec<Result<(MediaAsset, Option<RemoteError>), AppError>> =
            stream::iter(assets.into_iter().map(|asset| self.upload(asset)))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut report = MediaBatchReport::default();
        for outcome in outcomes {
            let (asset, error) = outcome?;
            match &error {
                None => report.uploaded += 1,
                Some(err) => {
                    report.failed += 1;
                    if err.class() == FailureClass::AuthFailure {
                        report.auth_failure = true;
                    }
                }
            }
            report.outcomes.push((asset.id, error));
        }

        Ok(report)
    }

    /// ペイロード中のローカル参照をアップロード済みのサーバーURLへ書き換える。
    /// 未解決の参照はそのまま保持され、黙って落とされることはない。
    pub fn resolve_refs(
        &self,
        payload: &RecordPayload,
        assets: &[MediaAsset],
    ) -> (RecordPayload, usize) {
        let mut resolved = payload.clone();
        if let Some(photos) = resolved.photos_mut() {
            for photo in photos.iter_mut() {
                if photo.is_remote() {
                    continue;
                }
                let uploaded = assets
                    .iter()
                    .find(|asset| asset.local_path == photo.as_str() && asset.is_uploaded());
                if let Some(asset) = uploaded {
                    if let Some(url) = &asset.server_url {
                        if let Ok(remote_ref) = MediaRef::new(url.clone()) {
                            *photo = remote_ref;
                        }
                    }
                }
            }
        }

        let unresolved = resolved.unresolved_media_count();
        (resolved, unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{MockRemoteGateway, PassthroughStaging};
    use crate::domain::entities::Record;
    use crate::domain::value_objects::{OwnerRef, UploadStatus};
    use crate::infrastructure::store::SqliteLocalStore;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> (MediaService, Arc<dyn LocalStore>, Arc<MockRemoteGateway>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let store: Arc<dyn LocalStore> = Arc::new(SqliteLocalStore::new(pool));
        let gateway = Arc::new(MockRemoteGateway::new());
        let service = MediaService::new(
            store.clone(),
            gateway.clone(),
            Arc::new(PassthroughStaging),
            3,
            3,
        );
        (service, store, gateway)
    }

    async fn parent_record(store: &Arc<dyn LocalStore>) -> RecordId {
        let record = Record::new(
            RecordId::temporary(),
            OwnerRef::parse("user_1").unwrap(),
            None,
            RecordPayload::inspection("Site"),
            Utc::now(),
        );
        store.upsert_record(&record).await.unwrap();
        record.id
    }

    fn asset_at(path: &str, parent: &RecordId) -> MediaAsset {
        MediaAsset::new(
            MediaId::generate(),
            path.to_string(),
            parent.clone(),
            128,
            "image/jpeg".to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn stage_registers_asset_and_enqueues_upload() {
        let (service, store, _) = setup().await;
        let parent = parent_record(&store).await;

        let asset = service
            .stage(Path::new("/captured/photo.jpg"), &parent)
            .await
            .unwrap();

        assert_eq!(asset.upload_status, UploadStatus::Pending);
        assert_eq!(store.count_queued().await.unwrap(), 1);
        assert_eq!(
            store.list_media_assets(&parent).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn stage_rejects_unknown_parent() {
        let (service, _, _) = setup().await;
        let result = service
            .stage(Path::new("/captured/photo.jpg"), &RecordId::temporary())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn upload_is_idempotent_after_success() {
        let (service, store, gateway) = setup().await;
        let parent = parent_record(&store).await;
        let asset = asset_at("/data/media/p1.jpg", &parent);
        store.upsert_media_asset(&asset).await.unwrap();

        let (uploaded, err) = service.upload(asset).await.unwrap();
        assert!(err.is_none());
        assert_eq!(uploaded.server_url.as_deref(), Some("https://cdn/p1.jpg"));
        assert_eq!(gateway.counts().upload, 1);

        // 2回目はネットワークに出ない
        let (again, err) = service.upload(uploaded).await.unwrap();
        assert!(err.is_none());
        assert!(again.is_uploaded());
        assert_eq!(gateway.counts().upload, 1);
    }

    #[tokio::test]
    async fn one_failed_upload_does_not_block_the_rest() {
        let (service, store, gateway) = setup().await;
        let parent = parent_record(&store).await;

        store
            .upsert_media_asset(&asset_at("/data/media/a.jpg", &parent))
            .await
            .unwrap();
        store
            .upsert_media_asset(&asset_at("/data/media/b.jpg", &parent))
            .await
            .unwrap();
        gateway.fail_upload_once(
            "/data/media/b.jpg",
            MockRemoteGateway::status_error(503, "unavailable"),
        );

        let report = service.upload_pending().await.unwrap();
        assert_eq!(report.uploaded, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.auth_failure);

        let assets = store.list_media_assets(&parent).await.unwrap();
        let a = assets
            .iter()
            .find(|asset| asset.local_path == "/data/media/a.jpg")
            .unwrap();
        let b = assets
            .iter()
            .find(|asset| asset.local_path == "/data/media/b.jpg")
            .unwrap();
        assert!(a.is_uploaded());
        assert_eq!(b.upload_status, UploadStatus::Failed);
        assert!(b.last_error.is_some());

        // 失敗した方は次のパスで再試行対象に含まれる
        let retryable = store.list_pending_uploads().await.unwrap();
        assert_eq!(retryable.len(), 1);
        assert_eq!(retryable[0].local_path, "/data/media/b.jpg");
    }

    #[tokio::test]
    async fn auth_failure_is_flagged_for_the_orchestrator() {
        let (service, store, gateway) = setup().await;
        let parent = parent_record(&store).await;
        store
            .upsert_media_asset(&asset_at("/data/media/a.jpg", &parent))
            .await
            .unwrap();
        gateway.fail_upload_once(
            "/data/media/a.jpg",
            MockRemoteGateway::status_error(401, "token expired"),
        );

        let report = service.upload_pending().await.unwrap();
        assert!(report.auth_failure);
    }

    #[tokio::test]
    async fn resolve_refs_rewrites_only_uploaded_assets() {
        let (service, store, _) = setup().await;
        let parent = parent_record(&store).await;

        let mut uploaded = asset_at("/data/media/a.jpg", &parent);
        uploaded.complete_upload("https://cdn/a.jpg".to_string(), Utc::now());
        let failed = asset_at("/data/media/b.jpg", &parent);

        let payload = RecordPayload::entry(
            Some("note".to_string()),
            vec![
                MediaRef::new("/data/media/a.jpg".to_string()).unwrap(),
                MediaRef::new("/data/media/b.jpg".to_string()).unwrap(),
            ],
        );

        let (resolved, unresolved) = service.resolve_refs(&payload, &[uploaded, failed]);
        assert_eq!(unresolved, 1);
        let photos = resolved.photos();
        assert_eq!(photos[0].as_str(), "https://cdn/a.jpg");
        assert_eq!(photos[1].as_str(), "/data/media/b.jpg");
    }
}
