use crate::application::observer::{ObserverHub, ProgressSnapshot};
use crate::application::ports::connectivity::ConnectivityProbe;
use crate::application::ports::local_store::LocalStore;
use crate::application::ports::remote_gateway::{FailureClass, RemoteError, RemoteGateway};
use crate::application::services::media_service::MediaService;
use crate::domain::conflict::{assess, ConflictAssessment, ConflictPolicy, Resolution};
use crate::domain::entities::{
    ConflictSnapshot, QueueOperation, QueueOperationDraft, Record, RemoteEntity, SyncReport,
};
use crate::domain::value_objects::{
    MediaId, OperationType, OwnerRef, RecordId, RecordPayload, SyncStatus, SyncTrigger,
};
use crate::shared::config::SyncConfig;
use crate::shared::error::AppError;
use crate::shared::metrics::{self, PassOutcomeMetadata, PassOutcomeStatus};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 再試行間隔の明示的なポリシー。パス内で眠るのではなく、窓が開くまでキューに残す。
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            base_delay_ms: config.backoff_base_delay_ms,
            multiplier: config.backoff_multiplier,
            max_attempts: config.max_retries,
        }
    }

    /// n回目の失敗後に空ける間隔。上限1時間。
    pub fn delay_after(&self, attempts: u32) -> Duration {
        if attempts == 0 {
            return Duration::zero();
        }
        let factor = self.multiplier.powi(attempts.saturating_sub(1) as i32);
        let millis = (self.base_delay_ms as f64 * factor).min(3_600_000.0);
        Duration::milliseconds(millis as i64)
    }

    pub fn is_due(&self, operation: &QueueOperation, now: DateTime<Utc>) -> bool {
        match operation.last_attempt_at {
            None => true,
            Some(last) => now >= last + self.delay_after(operation.retry_count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpOutcome {
    Completed,
    Failed,
    Skipped,
    Cancelled,
    AuthAbort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassFlow {
    Continue,
    Abort,
}

/// 同期オーケストレータ。`run_sync` はプロセス内で同時に1本しか走らない。
pub struct SyncService {
    store: Arc<dyn LocalStore>,
    gateway: Arc<dyn RemoteGateway>,
    media: Arc<MediaService>,
    connectivity: Arc<dyn ConnectivityProbe>,
    conflict_policy: Arc<dyn ConflictPolicy>,
    observers: Arc<ObserverHub>,
    backoff: BackoffPolicy,
    max_retries: u32,
    gate: Mutex<()>,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn LocalStore>,
        gateway: Arc<dyn RemoteGateway>,
        media: Arc<MediaService>,
        connectivity: Arc<dyn ConnectivityProbe>,
        conflict_policy: Arc<dyn ConflictPolicy>,
        observers: Arc<ObserverHub>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            media,
            connectivity,
            conflict_policy,
            observers,
            backoff: BackoffPolicy::from_config(config),
            max_retries: config.max_retries,
            gate: Mutex::new(()),
        }
    }

    /// 単一エントリポイント。進行中のパスがあればゼロワークで即座に返る。
    pub async fn run_sync(
        &self,
        owner: &OwnerRef,
        trigger: SyncTrigger,
    ) -> Result<SyncReport, AppError> {
        let started_at = Utc::now();

        let _guard = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(
                    target: "sync::orchestrator",
                    trigger = %trigger,
                    "sync already in flight; returning zero-work result"
                );
                metrics::record_pass(
                    PassOutcomeStatus::Skipped,
                    &PassOutcomeMetadata {
                        trigger: Some(trigger.as_str().to_string()),
                        ..PassOutcomeMetadata::default()
                    },
                );
                return Ok(SyncReport::skipped(trigger, started_at));
            }
        };

        if !self.connectivity.is_online().await {
            tracing::info!(
                target: "sync::orchestrator",
                trigger = %trigger,
                "offline; aborting pass before any mutation"
            );
            metrics::record_pass(
                PassOutcomeStatus::Skipped,
                &PassOutcomeMetadata {
                    trigger: Some(trigger.as_str().to_string()),
                    ..PassOutcomeMetadata::default()
                },
            );
            return Ok(SyncReport::offline(trigger, started_at));
        }

        let mut report = SyncReport::new(trigger, started_at);
        let result = self.run_pass(owner, &mut report).await;

        let finished_at = Utc::now();
        report.finished_at = Some(finished_at);
        let meta = PassOutcomeMetadata {
            trigger: Some(trigger.as_str().to_string()),
            duration_ms: Some((finished_at - started_at).num_milliseconds().max(0) as u64),
            pushed: Some(report.pushed),
            pulled: Some(report.pulled),
            failed: Some(report.push_failed + report.media_failed),
        };

        match result {
            Ok(()) => {
                metrics::record_pass(PassOutcomeStatus::Success, &meta);
                tracing::info!(
                    target: "sync::orchestrator",
                    trigger = %trigger,
                    pushed = report.pushed,
                    pulled = report.pulled,
                    failed = report.push_failed,
                    conflicts = report.conflicts,
                    auth_required = report.auth_required,
                    "sync pass finished"
                );
                Ok(report)
            }
            Err(err) => {
                metrics::record_pass(PassOutcomeStatus::Failure, &meta);
                tracing::error!(
                    target: "sync::orchestrator",
                    trigger = %trigger,
                    error = %err,
                    "sync pass failed"
                );
                Err(err)
            }
        }
    }

    async fn run_pass(&self, owner: &OwnerRef, report: &mut SyncReport) -> Result<(), AppError> {
        // フェーズA-1: メディアを有界並列で先行アップロードする
        let media_report = self.media.upload_pending().await?;
        report.media_uploaded = media_report.uploaded;
        report.media_failed = media_report.failed;
        if media_report.auth_failure {
            report.auth_required = true;
            return Ok(());
        }

        let media_failures: HashMap<String, RemoteError> = media_report
            .outcomes
            .into_iter()
            .filter_map(|(id, err)| err.map(|err| (id.to_string(), err)))
            .collect();

        // フェーズA-2..5: キューの排出
        if self.push(owner, &media_failures, report).await? == PassFlow::Abort {
            return Ok(());
        }

        // フェーズB: リモート一覧との照合
        self.pull(owner, report).await?;
        Ok(())
    }

    async fn push(
        &self,
        owner: &OwnerRef,
        media_failures: &HashMap<String, RemoteError>,
        report: &mut SyncReport,
    ) -> Result<PassFlow, AppError> {
        let operations = self.store.dequeue_all().await?;
        let total = operations.len() as u32;
        let mut completed = 0u32;
        let mut failed = 0u32;
        let mut parent_active: HashMap<String, bool> = HashMap::new();
        let mut cancelled: HashSet<String> = HashSet::new();

        self.emit(total, completed, failed, None);

        for operation in operations {
            if cancelled.contains(&operation.entity_id) {
                continue;
            }
            if !self.backoff.is_due(&operation, Utc::now()) {
                continue;
            }

            self.emit(
                total,
                completed,
                failed,
                Some(format!(
                    "{} {}",
                    operation.operation_type, operation.entity_id
                )),
            );

            let outcome = self
                .dispatch(
                    owner,
                    &operation,
                    media_failures,
                    &mut parent_active,
                    &mut cancelled,
                    report,
                )
                .await?;

            match outcome {
                OpOutcome::Completed => completed += 1,
                OpOutcome::Failed | OpOutcome::Cancelled => failed += 1,
                OpOutcome::Skipped => {}
                OpOutcome::AuthAbort => {
                    failed += 1;
                    report.pushed = completed;
                    report.push_failed = failed;
                    report.auth_required = true;
                    self.emit(total, completed, failed, None);
                    tracing::warn!(
                        target: "sync::push",
                        "authentication failure; aborting pass, remaining operations untouched"
                    );
                    return Ok(PassFlow::Abort);
                }
            }
        }

        report.pushed = completed;
        report.push_failed = failed;
        self.emit(total, completed, failed, None);
        Ok(PassFlow::Continue)
    }

    async fn dispatch(
        &self,
        owner: &OwnerRef,
        operation: &QueueOperation,
        media_failures: &HashMap<String, RemoteError>,
        parent_active: &mut HashMap<String, bool>,
        cancelled: &mut HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<OpOutcome, AppError> {
        if operation.operation_type == OperationType::UploadMedia {
            return self.dispatch_media(operation, media_failures, report).await;
        }

        let record_id = match operation.record_id() {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(
                    target: "sync::push",
                    entity_id = %operation.entity_id,
                    error = %err,
                    "dropping operation with invalid entity reference"
                );
                self.store.remove_from_queue(operation.id).await?;
                return Ok(OpOutcome::Skipped);
            }
        };

        let Some(record) = self.store.get_record(&record_id).await? else {
            self.store.remove_from_queue(operation.id).await?;
            return Ok(OpOutcome::Skipped);
        };

        // 親の遠隔状態を確認し、終端なら連鎖キャンセルする
        if matches!(
            operation.operation_type,
            OperationType::Create | OperationType::Update
        ) {
            if let Some(parent_ref) = record.parent_ref.clone() {
                if !parent_ref.is_local() {
                    let active = match parent_active.get(parent_ref.as_str()).copied() {
                        Some(active) => active,
                        None => match self.gateway.fetch_entity(&parent_ref).await {
                            Ok(state) => {
                                let active = state
                                    .map(|entity| !entity.terminal && !entity.deleted)
                                    .unwrap_or(false);
                                parent_active.insert(parent_ref.as_str().to_string(), active);
                                active
                            }
                            Err(err) => {
                                return self
                                    .handle_remote_failure(operation, Some(&record_id), err, report)
                                    .await;
                            }
                        },
                    };
                    if !active {
                        self.cascade_cancel(&parent_ref, cancelled, report).await?;
                        return Ok(OpOutcome::Cancelled);
                    }
                }
            }
        }

        match operation.operation_type {
            OperationType::Create => self.push_create(owner, operation, record, report).await,
            OperationType::Update | OperationType::FinalizeParent => {
                self.push_update(operation, record, report).await
            }
            OperationType::Delete => self.push_delete(operation, record, report).await,
            OperationType::UploadMedia => Ok(OpOutcome::Skipped),
        }
    }

    async fn dispatch_media(
        &self,
        operation: &QueueOperation,
        media_failures: &HashMap<String, RemoteError>,
        report: &mut SyncReport,
    ) -> Result<OpOutcome, AppError> {
        let media_id = match MediaId::new(operation.entity_id.clone()) {
            Ok(id) => id,
            Err(_) => {
                self.store.remove_from_queue(operation.id).await?;
                return Ok(OpOutcome::Skipped);
            }
        };

        let Some(asset) = self.store.get_media_asset(&media_id).await? else {
            self.store.remove_from_queue(operation.id).await?;
            return Ok(OpOutcome::Skipped);
        };

        if asset.is_uploaded() {
            self.store.remove_from_queue(operation.id).await?;
            return Ok(OpOutcome::Completed);
        }

        // フェーズA-1で既に試行済みなら同一パス内で再送しない
        if let Some(err) = media_failures.get(operation.entity_id.as_str()) {
            return self
                .handle_remote_failure(operation, None, err.clone(), report)
                .await;
        }

        let (_, error) = self.media.upload(asset).await?;
        match error {
            None => {
                self.store.remove_from_queue(operation.id).await?;
                Ok(OpOutcome::Completed)
            }
            Some(err) => {
                self.handle_remote_failure(operation, None, err, report)
                    .await
            }
        }
    }

    async fn push_create(
        &self,
        owner: &OwnerRef,
        operation: &QueueOperation,
        record: Record,
        report: &mut SyncReport,
    ) -> Result<OpOutcome, AppError> {
        let assets = self.store.list_media_assets(&record.id).await?;
        let (resolved, unresolved) = self.media.resolve_refs(&record.payload, &assets);
        let payload_value = resolved.to_value().map_err(AppError::SerializationError)?;

        match self
            .gateway
            .create_entity(owner, record.parent_ref.as_ref(), &payload_value)
            .await
        {
            Ok(ack) => {
                let server_id = RecordId::parse(&ack.id).map_err(AppError::ValidationError)?;
                self.store.reconcile_id(&record.id, &server_id).await?;

                let mut saved = self.store.get_record(&server_id).await?.ok_or_else(|| {
                    AppError::Internal("Record disappeared during id reconciliation".to_string())
                })?;
                saved.payload = resolved;
                if unresolved == 0 {
                    saved.mark_synced(ack.updated_at, Utc::now());
                } else {
                    saved.mark_partially_synced(ack.updated_at, Utc::now());
                }
                self.store.upsert_record(&saved).await?;
                self.store.remove_from_queue(operation.id).await?;

                if unresolved > 0 {
                    // 未解決の写真参照が残る間は pending のまま再送を積んでおく
                    self.store
                        .enqueue(
                            QueueOperationDraft::update(&saved, operation.max_retries)
                                .map_err(AppError::SerializationError)?,
                        )
                        .await?;
                }

                tracing::info!(
                    target: "sync::push",
                    server_id = %server_id,
                    unresolved_media = unresolved,
                    "record created remotely"
                );
                Ok(OpOutcome::Completed)
            }
            Err(err) => {
                self.handle_remote_failure(operation, Some(&record.id), err, report)
                    .await
            }
        }
    }

    async fn push_update(
        &self,
        operation: &QueueOperation,
        mut record: Record,
        report: &mut SyncReport,
    ) -> Result<OpOutcome, AppError> {
        let assets = self.store.list_media_assets(&record.id).await?;
        let (resolved, unresolved) = self.media.resolve_refs(&record.payload, &assets);
        let payload_value = resolved.to_value().map_err(AppError::SerializationError)?;

        match self.gateway.update_entity(&record.id, &payload_value).await {
            Ok(ack) => {
                record.payload = resolved;
                if unresolved == 0 {
                    record.mark_synced(ack.updated_at, Utc::now());
                } else {
                    record.mark_partially_synced(ack.updated_at, Utc::now());
                }
                self.store.upsert_record(&record).await?;
                self.store.remove_from_queue(operation.id).await?;

                if unresolved > 0 {
                    self.store
                        .enqueue(
                            QueueOperationDraft::update(&record, operation.max_retries)
                                .map_err(AppError::SerializationError)?,
                        )
                        .await?;
                }

                Ok(OpOutcome::Completed)
            }
            Err(err) => {
                self.handle_remote_failure(operation, Some(&record.id), err, report)
                    .await
            }
        }
    }

    async fn push_delete(
        &self,
        operation: &QueueOperation,
        record: Record,
        _report: &mut SyncReport,
    ) -> Result<OpOutcome, AppError> {
        // リモートに存在しないレコードの削除はローカル完結
        if record.id.is_local() {
            self.store.delete_record(&record.id).await?;
            self.store.remove_from_queue(operation.id).await?;
            return Ok(OpOutcome::Completed);
        }

        match self.gateway.delete_entity(&record.id).await {
            Ok(()) => {
                // 双方で削除が確定したので墓標を物理削除する
                self.store.delete_record(&record.id).await?;
                self.store.remove_from_queue(operation.id).await?;
                Ok(OpOutcome::Completed)
            }
            Err(err) => {
                self.handle_remote_failure(operation, Some(&record.id), err, _report)
                    .await
            }
        }
    }

    async fn handle_remote_failure(
        &self,
        operation: &QueueOperation,
        record_id: Option<&RecordId>,
        err: RemoteError,
        report: &mut SyncReport,
    ) -> Result<OpOutcome, AppError> {
        let now = Utc::now();
        let mut class = err.class();
        // POST への 404 は対象消失ではなく要求不備として扱う
        if class == FailureClass::Gone && operation.operation_type == OperationType::Create {
            class = FailureClass::NonRetryable;
        }

        match class {
            FailureClass::AuthFailure => {
                self.store
                    .mark_attempt(operation.id, &err.to_string(), now)
                    .await?;
                Ok(OpOutcome::AuthAbort)
            }
            FailureClass::Transient => {
                self.store
                    .mark_attempt(operation.id, &err.to_string(), now)
                    .await?;
                if operation.is_last_attempt() {
                    self.store.remove_from_queue(operation.id).await?;
                    if let Some(id) = record_id {
                        self.park_in_conflict(id, report).await?;
                    }
                    tracing::warn!(
                        target: "sync::push",
                        entity_id = %operation.entity_id,
                        retries = operation.max_retries,
                        error = %err,
                        "retries exhausted; operation dropped"
                    );
                } else {
                    tracing::debug!(
                        target: "sync::push",
                        entity_id = %operation.entity_id,
                        retry_count = operation.retry_count + 1,
                        error = %err,
                        "transient failure; operation stays queued"
                    );
                }
                Ok(OpOutcome::Failed)
            }
            FailureClass::NonRetryable => {
                // 1回の試行で打ち切る。黙って再試行しない。
                self.store
                    .mark_attempt(operation.id, &err.to_string(), now)
                    .await?;
                self.store.remove_from_queue(operation.id).await?;
                if let Some(id) = record_id {
                    self.park_in_conflict(id, report).await?;
                }
                tracing::warn!(
                    target: "sync::push",
                    entity_id = %operation.entity_id,
                    error = %err,
                    "non-retryable failure; operation removed"
                );
                Ok(OpOutcome::Failed)
            }
            FailureClass::Gone => {
                // 対象がリモートから消えている。削除の伝播として墓標化する。
                self.store.remove_from_queue(operation.id).await?;
                if let Some(id) = record_id {
                    self.store.tombstone(id, now).await?;
                    report.tombstoned += 1;
                }
                Ok(OpOutcome::Failed)
            }
        }
    }

    async fn park_in_conflict(
        &self,
        id: &RecordId,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        if let Some(mut record) = self.store.get_record(id).await? {
            if record.sync_status != SyncStatus::Conflict {
                record.mark_conflict(None);
                self.store.upsert_record(&record).await?;
                report.conflicts += 1;
            }
        }
        Ok(())
    }

    /// 親が終端。親と子の全操作をキューから外し、該当レコードを競合に落とす。
    async fn cascade_cancel(
        &self,
        parent_ref: &RecordId,
        cancelled: &mut HashSet<String>,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        tracing::warn!(
            target: "sync::push",
            parent = %parent_ref,
            "parent is terminal or gone remotely; cancelling dependent operations"
        );

        let mut affected = Vec::new();
        if let Some(parent) = self.store.get_record(parent_ref).await? {
            affected.push(parent);
        }
        affected.extend(self.store.list_child_records(parent_ref).await?);

        for mut record in affected {
            let removed = self
                .store
                .remove_operations_for_entity(record.id.as_str())
                .await?;
            cancelled.insert(record.id.to_string());
            if removed > 0 && record.sync_status != SyncStatus::Conflict {
                record.mark_conflict(None);
                self.store.upsert_record(&record).await?;
                report.conflicts += 1;
            }
        }
        Ok(())
    }

    async fn pull(&self, owner: &OwnerRef, report: &mut SyncReport) -> Result<(), AppError> {
        let remote_top = match self.gateway.list_entities(owner).await {
            Ok(entities) => entities,
            Err(err) => {
                if err.class() == FailureClass::AuthFailure {
                    report.auth_required = true;
                }
                tracing::warn!(
                    target: "sync::pull",
                    error = %err,
                    "remote listing failed; skipping pull phase"
                );
                return Ok(());
            }
        };

        let mut remote_ids: HashSet<String> = HashSet::new();
        for entity in &remote_top {
            if entity.deleted {
                continue;
            }
            remote_ids.insert(entity.id.clone());
            self.reconcile_remote_entity(owner, None, entity, report)
                .await?;
        }

        // リモート一覧から消えた synced レコードの墓標化（リモート削除の伝播）
        let locals = self.store.list_records(owner).await?;
        for record in locals.iter().filter(|record| record.parent_ref.is_none()) {
            if record.sync_status == SyncStatus::Synced
                && !record.id.is_local()
                && !remote_ids.contains(record.id.as_str())
            {
                self.store.tombstone(&record.id, Utc::now()).await?;
                report.tombstoned += 1;
            }
        }

        // 親ごとに子エンティティへ再帰する
        let parents = self.store.list_records(owner).await?;
        for parent in parents
            .into_iter()
            .filter(|record| record.parent_ref.is_none() && !record.id.is_local())
        {
            let children = match self.gateway.list_children(owner, &parent.id).await {
                Ok(children) => children,
                Err(err) => {
                    if err.class() == FailureClass::AuthFailure {
                        report.auth_required = true;
                        return Ok(());
                    }
                    tracing::warn!(
                        target: "sync::pull",
                        parent = %parent.id,
                        error = %err,
                        "child listing failed; continuing with next parent"
                    );
                    continue;
                }
            };

            let mut child_ids: HashSet<String> = HashSet::new();
            for entity in &children {
                if entity.deleted {
                    continue;
                }
                child_ids.insert(entity.id.clone());
                self.reconcile_remote_entity(owner, Some(&parent.id), entity, report)
                    .await?;
            }

            let local_children = self.store.list_child_records(&parent.id).await?;
            for child in local_children {
                if child.is_deleted {
                    continue;
                }
                if child.sync_status == SyncStatus::Synced
                    && !child.id.is_local()
                    && !child_ids.contains(child.id.as_str())
                {
                    self.store.tombstone(&child.id, Utc::now()).await?;
                    report.tombstoned += 1;
                }
            }
        }

        Ok(())
    }

    async fn reconcile_remote_entity(
        &self,
        owner: &OwnerRef,
        parent_ref: Option<&RecordId>,
        entity: &RemoteEntity,
        report: &mut SyncReport,
    ) -> Result<(), AppError> {
        let id = match RecordId::parse(&entity.id) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(target: "sync::pull", error = %err, "skipping entity with invalid id");
                return Ok(());
            }
        };
        let payload = match RecordPayload::from_value(&entity.payload) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    target: "sync::pull",
                    entity_id = %entity.id,
                    error = %err,
                    "skipping entity with malformed payload"
                );
                return Ok(());
            }
        };

        match self.store.get_record(&id).await? {
            None => {
                let mut record =
                    Record::new(id, owner.clone(), parent_ref.cloned(), payload, Utc::now());
                record.mark_synced(entity.updated_at, Utc::now());
                self.store.upsert_record(&record).await?;
                report.pulled += 1;
            }
            // ローカル削除待ちの墓標。push 側の delete が決着をつける
            Some(record) if record.is_deleted => {}
            // 解決待ちの競合はそのまま
            Some(record) if record.sync_status == SyncStatus::Conflict => {}
            Some(mut record) => {
                if record.server_updated_at == Some(entity.updated_at)
                    && !record.has_pending_edit()
                {
                    return Ok(());
                }

                match assess(
                    &record.payload,
                    record.local_updated_at,
                    record.last_synced_at,
                    &payload,
                    entity.updated_at,
                ) {
                    ConflictAssessment::ProceedLocal => {}
                    ConflictAssessment::AdoptRemote => {
                        record.adopt_remote(payload, entity.updated_at, Utc::now());
                        self.store.upsert_record(&record).await?;
                        report.pulled += 1;
                    }
                    ConflictAssessment::Conflict(pair) => match self.conflict_policy.resolve(&pair)
                    {
                        None => {
                            record.mark_conflict(Some(ConflictSnapshot {
                                remote_payload: pair.remote,
                                remote_updated_at: pair.remote_updated_at,
                            }));
                            self.store.upsert_record(&record).await?;
                            report.conflicts += 1;
                        }
                        Some(Resolution::KeepLocal) => {
                            // 保留編集が次の push で勝つ。何もしない。
                        }
                        Some(Resolution::KeepServer) => {
                            record.adopt_remote(payload, entity.updated_at, Utc::now());
                            self.store.upsert_record(&record).await?;
                            self.store
                                .remove_operations_for_entity(record.id.as_str())
                                .await?;
                            report.pulled += 1;
                        }
                        Some(Resolution::Merge { payload: merged }) => {
                            record.apply_local_edit(merged, Utc::now());
                            self.store.upsert_record(&record).await?;
                            self.store
                                .enqueue(
                                    QueueOperationDraft::update(&record, self.max_retries)
                                        .map_err(AppError::SerializationError)?,
                                )
                                .await?;
                        }
                    },
                }
            }
        }

        Ok(())
    }

    fn emit(&self, total: u32, completed: u32, failed: u32, current_operation: Option<String>) {
        self.observers.emit(&ProgressSnapshot {
            total,
            completed,
            failed,
            current_operation,
        });
    }
}
