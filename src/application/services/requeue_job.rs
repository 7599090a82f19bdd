use crate::application::ports::local_store::LocalStore;
use crate::domain::entities::QueueOperationDraft;
use crate::domain::value_objects::{OwnerRef, SyncStatus};
use crate::shared::error::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequeueReport {
    pub pending_records: usize,
    pub requeued: usize,
    pub queue_depth: u64,
}

/// クラッシュ後の復旧ジョブ。キュー項目を失った `pending` レコードへ操作を積み直す。
pub struct RequeueJob {
    store: Arc<dyn LocalStore>,
    max_retries: u32,
    gate: Mutex<()>,
}

impl RequeueJob {
    pub fn new(store: Arc<dyn LocalStore>, max_retries: u32) -> Arc<Self> {
        Arc::new(Self {
            store,
            max_retries,
            gate: Mutex::new(()),
        })
    }

    pub async fn run_once(&self, owner: &OwnerRef) -> Result<RequeueReport, AppError> {
        let _guard = self.gate.lock().await;

        let reset = self.store.reset_stuck_uploads().await?;
        if reset > 0 {
            tracing::warn!(
                target: "sync::requeue",
                reset,
                "uploads left in-flight by a previous run were reset to pending"
            );
        }

        let records = self.store.list_records(owner).await?;
        let pending: Vec<_> = records
            .into_iter()
            .filter(|record| record.sync_status == SyncStatus::Pending)
            .collect();

        let mut requeued = 0usize;
        for record in &pending {
            if self.store.has_operation_for(record.id.as_str()).await? {
                continue;
            }

            // 未作成のレコードは create、作成済みは update で積み直す
            let draft = if record.id.is_local() {
                QueueOperationDraft::create(record, self.max_retries)
                    .map_err(AppError::SerializationError)?
            } else {
                QueueOperationDraft::update(record, self.max_retries)
                    .map_err(AppError::SerializationError)?
            };
            self.store.enqueue(draft).await?;
            requeued += 1;
        }

        let report = RequeueReport {
            pending_records: pending.len(),
            requeued,
            queue_depth: self.store.count_queued().await?,
        };

        tracing::info!(
            target: "sync::requeue",
            pending = report.pending_records,
            requeued = report.requeued,
            queue_depth = report.queue_depth,
            "requeue pass completed"
        );

        Ok(report)
    }
}
