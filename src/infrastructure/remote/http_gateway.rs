use crate::application::ports::connectivity::ConnectivityProbe;
use crate::application::ports::remote_gateway::{RemoteError, RemoteGateway};
use crate::domain::entities::{MediaAsset, RemoteEntity, RemoteWriteAck};
use crate::domain::value_objects::{OwnerRef, RecordId};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// リモート権威へのHTTPバインディング。全呼び出しに設定由来のタイムアウトが乗る。
pub struct HttpRemoteGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteAckBody {
    #[serde(default)]
    id: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct MediaAckBody {
    url: String,
}

impl HttpRemoteGateway {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn status_error(response: reqwest::Response) -> RemoteError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(512)
            .collect();
        RemoteError::Status { status, message }
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RemoteError> {
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    async fn list_entities(&self, owner: &OwnerRef) -> Result<Vec<RemoteEntity>, RemoteError> {
        let response = self
            .client
            .get(self.url("entities"))
            .query(&[("owner", owner.as_str())])
            .send()
            .await
            .map_err(transport)?;

        Self::decode(response).await
    }

    async fn list_children(
        &self,
        owner: &OwnerRef,
        parent: &RecordId,
    ) -> Result<Vec<RemoteEntity>, RemoteError> {
        let response = self
            .client
            .get(self.url("entities"))
            .query(&[("owner", owner.as_str()), ("parent", parent.as_str())])
            .send()
            .await
            .map_err(transport)?;

        Self::decode(response).await
    }

    async fn fetch_entity(&self, id: &RecordId) -> Result<Option<RemoteEntity>, RemoteError> {
        let response = self
            .client
            .get(self.url(&format!("entities/{}", id.as_str())))
            .send()
            .await
            .map_err(transport)?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        Self::decode::<RemoteEntity>(response).await.map(Some)
    }

    async fn create_entity(
        &self,
        owner: &OwnerRef,
        parent: Option<&RecordId>,
        payload: &Value,
    ) -> Result<RemoteWriteAck, RemoteError> {
        let mut request = self
            .client
            .post(self.url("entities"))
            .query(&[("owner", owner.as_str())]);
        if let Some(parent) = parent {
            request = request.query(&[("parent", parent.as_str())]);
        }

        let response = request.json(payload).send().await.map_err(transport)?;
        let body: WriteAckBody = Self::decode(response).await?;
        let id = body
            .id
            .ok_or_else(|| RemoteError::Decode("create response is missing id".to_string()))?;

        Ok(RemoteWriteAck {
            id,
            updated_at: body.updated_at,
        })
    }

    async fn update_entity(
        &self,
        id: &RecordId,
        payload: &Value,
    ) -> Result<RemoteWriteAck, RemoteError> {
        let response = self
            .client
            .patch(self.url(&format!("entities/{}", id.as_str())))
            .json(payload)
            .send()
            .await
            .map_err(transport)?;

        let body: WriteAckBody = Self::decode(response).await?;
        Ok(RemoteWriteAck {
            // PATCH 応答はIDを省略できる
            id: body.id.unwrap_or_else(|| id.to_string()),
            updated_at: body.updated_at,
        })
    }

    async fn delete_entity(&self, id: &RecordId) -> Result<(), RemoteError> {
        let response = self
            .client
            .delete(self.url(&format!("entities/{}", id.as_str())))
            .send()
            .await
            .map_err(transport)?;

        // 既に消えている対象の削除は成功扱い
        if response.status().is_success() || response.status().as_u16() == 404 {
            return Ok(());
        }

        Err(Self::status_error(response).await)
    }

    async fn upload_media(&self, asset: &MediaAsset) -> Result<String, RemoteError> {
        let bytes = tokio::fs::read(&asset.local_path)
            .await
            .map_err(|err| RemoteError::Transport(format!("Local file unreadable: {err}")))?;

        let file_name = std::path::Path::new(&asset.local_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| asset.id.to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&asset.mime_type)
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("media"))
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        let body: MediaAckBody = Self::decode(response).await?;
        Ok(body.url)
    }
}

/// パス開始前の到達性確認。応答ステータスは問わず、到達できたかだけを見る。
pub struct HttpConnectivityProbe {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConnectivityProbe {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.connectivity_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn is_online(&self) -> bool {
        self.client.head(&self.base_url).send().await.is_ok()
    }
}
