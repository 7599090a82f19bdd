use crate::application::observer::ObserverHub;
use crate::application::ports::connectivity::ConnectivityProbe;
use crate::application::ports::file_staging::FileStaging;
use crate::application::ports::local_store::LocalStore;
use crate::application::ports::remote_gateway::RemoteGateway;
use crate::application::services::{MediaService, RecordService, RequeueJob, SyncService};
use crate::application::triggers::SyncScheduler;
use crate::domain::conflict::policy_for;
use crate::domain::value_objects::OwnerRef;
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::media::DiskFileStaging;
use crate::infrastructure::remote::{HttpConnectivityProbe, HttpRemoteGateway};
use crate::infrastructure::store::SqliteLocalStore;
use crate::shared::config::AppConfig;
use std::sync::Arc;

/// アプリ起動時に一度だけ構築する合成ルート。
/// グローバルシングルトンを持たず、参照で各層へ配る。
pub struct EngineContext {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    pub store: Arc<dyn LocalStore>,
    pub observers: Arc<ObserverHub>,
    pub records: Arc<RecordService>,
    pub media: Arc<MediaService>,
    pub sync: Arc<SyncService>,
    pub requeue: Arc<RequeueJob>,
}

impl EngineContext {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .map_err(|message| anyhow::anyhow!(message))?;

        std::fs::create_dir_all(&config.media.data_dir)?;

        let pool = ConnectionPool::new(&config.database).await?;
        pool.migrate().await?;

        let store: Arc<dyn LocalStore> =
            Arc::new(SqliteLocalStore::new(pool.get_pool().clone()));
        let gateway: Arc<dyn RemoteGateway> = Arc::new(HttpRemoteGateway::new(&config.remote)?);
        let connectivity: Arc<dyn ConnectivityProbe> =
            Arc::new(HttpConnectivityProbe::new(&config.remote)?);
        let staging: Arc<dyn FileStaging> = Arc::new(DiskFileStaging::new(&config.media));
        let observers = Arc::new(ObserverHub::new());

        let media = Arc::new(MediaService::new(
            store.clone(),
            gateway.clone(),
            staging,
            config.sync.media_concurrency,
            config.sync.max_retries,
        ));
        let sync = Arc::new(SyncService::new(
            store.clone(),
            gateway,
            media.clone(),
            connectivity,
            policy_for(config.sync.conflict_policy),
            observers.clone(),
            &config.sync,
        ));
        let records = Arc::new(RecordService::new(store.clone(), config.sync.max_retries));
        let requeue = RequeueJob::new(store.clone(), config.sync.max_retries);

        Ok(Self {
            config,
            pool,
            store,
            observers,
            records,
            media,
            sync,
            requeue,
        })
    }

    pub fn scheduler(&self, owner: OwnerRef) -> SyncScheduler {
        SyncScheduler::new(self.sync.clone(), owner, self.config.sync.sync_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::RecordPayload;

    #[tokio::test]
    async fn context_builds_and_serves_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        // インメモリDBは接続ごとに別物になるため1本に固定する
        config.database.max_connections = 1;
        config.media.data_dir = tmp.path().to_string_lossy().into_owned();

        let context = EngineContext::new(config).await.unwrap();

        let owner = OwnerRef::parse("user_1").unwrap();
        let record = context
            .records
            .create_record(owner.clone(), None, RecordPayload::inspection("Site"))
            .await
            .unwrap();

        assert!(record.id.is_local());
        assert_eq!(context.records.list_records(&owner).await.unwrap().len(), 1);
        assert_eq!(context.store.count_queued().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.sync.media_concurrency = 0;
        assert!(EngineContext::new(config).await.is_err());
    }
}
