use crate::domain::entities::{MediaAsset, RemoteEntity, RemoteWriteAck};
use crate::domain::value_objects::{OwnerRef, RecordId};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// リモート障害の分類。オーケストレータの再試行・中断・連鎖キャンセルを決める。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// ネットワーク断・タイムアウト・5xx。バックオフ付きで再試行される。
    Transient,
    /// 400/409/413/422 など。1回の試行で打ち切り、呼び出し側へ表面化する。
    NonRetryable,
    /// 401/403。パス全体を即座に中断し、再認証を要求する。
    AuthFailure,
    /// 404。対象がリモートに存在しない。
    Gone,
}

impl FailureClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => FailureClass::AuthFailure,
            404 => FailureClass::Gone,
            408 | 429 => FailureClass::Transient,
            400..=499 => FailureClass::NonRetryable,
            _ => FailureClass::Transient,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("remote returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn class(&self) -> FailureClass {
        match self {
            RemoteError::Status { status, .. } => FailureClass::from_status(*status),
            // 壊れた応答は一過性のサーバー異常として扱い、次パスに回す。
            RemoteError::Transport(_) | RemoteError::Decode(_) => FailureClass::Transient,
        }
    }
}

/// リモート権威との境界。ビジネス的な意味は持たず、不透明なペイロードを運ぶだけ。
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// 所有者スコープのトップレベル一覧。
    async fn list_entities(&self, owner: &OwnerRef) -> Result<Vec<RemoteEntity>, RemoteError>;
    /// 親配下の子エンティティ一覧。
    async fn list_children(
        &self,
        owner: &OwnerRef,
        parent: &RecordId,
    ) -> Result<Vec<RemoteEntity>, RemoteError>;
    /// 単一取得。404 は `Ok(None)`。
    async fn fetch_entity(&self, id: &RecordId) -> Result<Option<RemoteEntity>, RemoteError>;
    async fn create_entity(
        &self,
        owner: &OwnerRef,
        parent: Option<&RecordId>,
        payload: &Value,
    ) -> Result<RemoteWriteAck, RemoteError>;
    async fn update_entity(
        &self,
        id: &RecordId,
        payload: &Value,
    ) -> Result<RemoteWriteAck, RemoteError>;
    /// 削除は冪等。既に消えている対象 (404) は成功として扱う。
    async fn delete_entity(&self, id: &RecordId) -> Result<(), RemoteError>;
    /// マルチパートでの媒体アップロード。返り値は公開URL。
    async fn upload_media(&self, asset: &MediaAsset) -> Result<String, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_matches_contract() {
        assert_eq!(FailureClass::from_status(500), FailureClass::Transient);
        assert_eq!(FailureClass::from_status(503), FailureClass::Transient);
        assert_eq!(FailureClass::from_status(429), FailureClass::Transient);
        assert_eq!(FailureClass::from_status(408), FailureClass::Transient);
        assert_eq!(FailureClass::from_status(409), FailureClass::NonRetryable);
        assert_eq!(FailureClass::from_status(400), FailureClass::NonRetryable);
        assert_eq!(FailureClass::from_status(413), FailureClass::NonRetryable);
        assert_eq!(FailureClass::from_status(422), FailureClass::NonRetryable);
        assert_eq!(FailureClass::from_status(401), FailureClass::AuthFailure);
        assert_eq!(FailureClass::from_status(403), FailureClass::AuthFailure);
        assert_eq!(FailureClass::from_status(404), FailureClass::Gone);
    }

    #[test]
    fn transport_errors_are_transient() {
        let err = RemoteError::Transport("connection reset".to_string());
        assert_eq!(err.class(), FailureClass::Transient);
    }
}
