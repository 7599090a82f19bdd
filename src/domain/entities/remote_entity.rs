use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// リモート権威が返すエンティティの境界表現。ペイロードは不透明なJSONのまま扱う。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntity {
    pub id: String,
    #[serde(default)]
    pub parent: Option<String>,
    pub payload: Value,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub terminal: bool,
}

/// 作成・更新が返す確認応答。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWriteAck {
    pub id: String,
    pub updated_at: DateTime<Utc>,
}
