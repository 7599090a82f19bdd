//! ハンドメイドのテスト用モック。ネットワークに出ずに遠隔権威の応答を脚本化する。

use crate::application::ports::connectivity::ConnectivityProbe;
use crate::application::ports::file_staging::{FileStaging, StagedFile};
use crate::application::ports::remote_gateway::{RemoteError, RemoteGateway};
use crate::domain::entities::{MediaAsset, RemoteEntity, RemoteWriteAck};
use crate::domain::value_objects::{OwnerRef, RecordId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MockCallCounts {
    pub list: u32,
    pub fetch: u32,
    pub create: u32,
    pub update: u32,
    pub delete: u32,
    pub upload: u32,
}

#[derive(Default)]
struct MockState {
    entities: HashMap<String, RemoteEntity>,
    next_id: u32,
    scripted_create: VecDeque<Option<RemoteError>>,
    scripted_update: VecDeque<Option<RemoteError>>,
    scripted_delete: VecDeque<Option<RemoteError>>,
    scripted_list: VecDeque<Option<RemoteError>>,
    upload_errors: HashMap<String, VecDeque<RemoteError>>,
    fetch_overrides: HashMap<String, Option<RemoteEntity>>,
    counts: MockCallCounts,
    latency: Option<Duration>,
}

/// エコーサーバー的な振る舞いのモック。成功経路では作成・更新・削除が内部状態へ反映され、
/// 脚本化されたエラーはメソッド毎のキューから順に注入される。
pub struct MockRemoteGateway {
    state: Mutex<MockState>,
}

impl MockRemoteGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1,
                ..MockState::default()
            }),
        }
    }

    pub fn status_error(status: u16, message: &str) -> RemoteError {
        RemoteError::Status {
            status,
            message: message.to_string(),
        }
    }

    /// `None` は既定の成功応答、`Some(err)` はそのエラーを返す。呼び出し順に消費される。
    pub fn script_create(&self, outcomes: Vec<Option<RemoteError>>) {
        self.state.lock().unwrap().scripted_create = outcomes.into();
    }

    pub fn script_update(&self, outcomes: Vec<Option<RemoteError>>) {
        self.state.lock().unwrap().scripted_update = outcomes.into();
    }

    pub fn script_delete(&self, outcomes: Vec<Option<RemoteError>>) {
        self.state.lock().unwrap().scripted_delete = outcomes.into();
    }

    pub fn script_list(&self, outcomes: Vec<Option<RemoteError>>) {
        self.state.lock().unwrap().scripted_list = outcomes.into();
    }

    /// 指定パスの次のアップロード1回を失敗させる。
    pub fn fail_upload_once(&self, local_path: &str, err: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .upload_errors
            .entry(local_path.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn set_fetch(&self, id: &str, entity: Option<RemoteEntity>) {
        self.state
            .lock()
            .unwrap()
            .fetch_overrides
            .insert(id.to_string(), entity);
    }

    pub fn insert_remote(&self, entity: RemoteEntity) {
        self.state
            .lock()
            .unwrap()
            .entities
            .insert(entity.id.clone(), entity);
    }

    pub fn remove_remote(&self, id: &str) {
        self.state.lock().unwrap().entities.remove(id);
    }

    pub fn remote_entity(&self, id: &str) -> Option<RemoteEntity> {
        self.state.lock().unwrap().entities.get(id).cloned()
    }

    pub fn counts(&self) -> MockCallCounts {
        self.state.lock().unwrap().counts
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = Some(latency);
    }

    async fn maybe_sleep(&self) {
        let latency = self.state.lock().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

/// SQLiteにはミリ秒で落ちるため、比較が揺れないようモック側も切り詰めて発行する。
pub fn now_millis() -> chrono::DateTime<Utc> {
    chrono::DateTime::<Utc>::from_timestamp_millis(Utc::now().timestamp_millis())
        .unwrap_or_else(Utc::now)
}

pub fn remote_entity(id: &str, parent: Option<&str>, payload: Value) -> RemoteEntity {
    RemoteEntity {
        id: id.to_string(),
        parent: parent.map(|p| p.to_string()),
        payload,
        updated_at: now_millis(),
        deleted: false,
        terminal: false,
    }
}

#[async_trait]
impl RemoteGateway for MockRemoteGateway {
    async fn list_entities(&self, _owner: &OwnerRef) -> Result<Vec<RemoteEntity>, RemoteError> {
        self.maybe_sleep().await;
        let mut state = self.state.lock().unwrap();
        state.counts.list += 1;
        if let Some(Some(err)) = state.scripted_list.pop_front() {
            return Err(err);
        }
        Ok(state
            .entities
            .values()
            .filter(|entity| entity.parent.is_none())
            .cloned()
            .collect())
    }

    async fn list_children(
        &self,
        _owner: &OwnerRef,
        parent: &RecordId,
    ) -> Result<Vec<RemoteEntity>, RemoteError> {
        self.maybe_sleep().await;
        let state = self.state.lock().unwrap();
        Ok(state
            .entities
            .values()
            .filter(|entity| entity.parent.as_deref() == Some(parent.as_str()))
            .cloned()
            .collect())
    }

    async fn fetch_entity(&self, id: &RecordId) -> Result<Option<RemoteEntity>, RemoteError> {
        self.maybe_sleep().await;
        let mut state = self.state.lock().unwrap();
        state.counts.fetch += 1;
        if let Some(overridden) = state.fetch_overrides.get(id.as_str()) {
            return Ok(overridden.clone());
        }
        Ok(state.entities.get(id.as_str()).cloned())
    }

    async fn create_entity(
        &self,
        _owner: &OwnerRef,
        parent: Option<&RecordId>,
        payload: &Value,
    ) -> Result<RemoteWriteAck, RemoteError> {
        self.maybe_sleep().await;
        let mut state = self.state.lock().unwrap();
        state.counts.create += 1;
        if let Some(Some(err)) = state.scripted_create.pop_front() {
            return Err(err);
        }

        let id = format!("srv_{}", state.next_id);
        state.next_id += 1;
        let updated_at = now_millis();
        state.entities.insert(
            id.clone(),
            RemoteEntity {
                id: id.clone(),
                parent: parent.map(|p| p.to_string()),
                payload: payload.clone(),
                updated_at,
                deleted: false,
                terminal: false,
            },
        );

        Ok(RemoteWriteAck { id, updated_at })
    }

    async fn update_entity(
        &self,
        id: &RecordId,
        payload: &Value,
    ) -> Result<RemoteWriteAck, RemoteError> {
        self.maybe_sleep().await;
        let mut state = self.state.lock().unwrap();
        state.counts.update += 1;
        if let Some(Some(err)) = state.scripted_update.pop_front() {
            return Err(err);
        }

        let updated_at = now_millis();
        match state.entities.get_mut(id.as_str()) {
            Some(entity) => {
                entity.payload = payload.clone();
                entity.updated_at = updated_at;
                Ok(RemoteWriteAck {
                    id: id.to_string(),
                    updated_at,
                })
            }
            None => Err(Self::status_error(404, "entity gone")),
        }
    }

    async fn delete_entity(&self, id: &RecordId) -> Result<(), RemoteError> {
        self.maybe_sleep().await;
        let mut state = self.state.lock().unwrap();
        state.counts.delete += 1;
        if let Some(Some(err)) = state.scripted_delete.pop_front() {
            return Err(err);
        }
        state.entities.remove(id.as_str());
        Ok(())
    }

    async fn upload_media(&self, asset: &MediaAsset) -> Result<String, RemoteError> {
        self.maybe_sleep().await;
        let mut state = self.state.lock().unwrap();
        state.counts.upload += 1;
        if let Some(queue) = state.upload_errors.get_mut(&asset.local_path) {
            if let Some(err) = queue.pop_front() {
                return Err(err);
            }
        }

        let file_name = Path::new(&asset.local_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| asset.id.to_string());
        Ok(format!("https://cdn/{file_name}"))
    }
}

pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

#[async_trait]
impl ConnectivityProbe for StaticConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

/// 進捗スナップショットを記録する購読者。
pub struct RecordingObserver {
    snapshots: Mutex<Vec<crate::application::observer::ProgressSnapshot>>,
}

impl RecordingObserver {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            snapshots: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<crate::application::observer::ProgressSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl crate::application::observer::SyncProgressObserver for RecordingObserver {
    fn on_progress(&self, snapshot: &crate::application::observer::ProgressSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}

/// 複製を行わず、渡されたパスをそのまま返すテスト用ステージング。
pub struct PassthroughStaging;

#[async_trait]
impl FileStaging for PassthroughStaging {
    async fn stage(&self, source: &Path) -> Result<StagedFile, AppError> {
        Ok(StagedFile {
            path: source.to_string_lossy().into_owned(),
            file_size: 0,
            mime_type: "image/jpeg".to_string(),
        })
    }
}
