use crate::application::services::sync_service::SyncService;
use crate::domain::entities::SyncReport;
use crate::domain::value_objects::{OwnerRef, SyncTrigger};
use crate::shared::error::AppError;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// トリガー層。フォアグラウンド復帰・接続回復・周期タイマー・手動操作を
/// すべて同じシングルフライト入口へ流し込む。
pub struct SyncScheduler {
    service: Arc<SyncService>,
    owner: OwnerRef,
    interval_secs: u64,
}

impl SyncScheduler {
    pub fn new(service: Arc<SyncService>, owner: OwnerRef, interval_secs: u64) -> Self {
        Self {
            service,
            owner,
            interval_secs: interval_secs.max(1),
        }
    }

    /// フォアグラウンド中の周期同期を起動する。ハンドルの破棄で停止できる。
    pub fn start(&self) -> JoinHandle<()> {
        let service = self.service.clone();
        let owner = self.owner.clone();
        let interval_secs = self.interval_secs;

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
            // 起動直後の即時発火は捨てる
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(e) = service.run_sync(&owner, SyncTrigger::Interval).await {
                    tracing::error!(
                        target: "sync::scheduler",
                        error = %e,
                        "interval sync failed"
                    );
                }
            }
        })
    }

    pub async fn on_app_foreground(&self) -> Result<SyncReport, AppError> {
        self.service
            .run_sync(&self.owner, SyncTrigger::Foreground)
            .await
    }

    pub async fn on_connectivity_regained(&self) -> Result<SyncReport, AppError> {
        self.service
            .run_sync(&self.owner, SyncTrigger::ConnectivityRegained)
            .await
    }

    pub async fn sync_now(&self) -> Result<SyncReport, AppError> {
        self.service.run_sync(&self.owner, SyncTrigger::Manual).await
    }
}
