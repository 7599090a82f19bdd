use crate::domain::value_objects::{EntityKind, MediaRef};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CURRENT_SCHEMA_VERSION: u16 = 1;

/// エンティティ種別ごとの判別共用体。業務フィールドは開かれた `fields` に保持する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordBody {
    Inspection {
        title: String,
        #[serde(default)]
        finalized: bool,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        fields: Map<String, Value>,
    },
    Entry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        photos: Vec<MediaRef>,
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        fields: Map<String, Value>,
    },
}

/// スキーマバージョン付きのレコード本体。書き込みは常に丸ごと差し替えられる不変値。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    pub schema_version: u16,
    #[serde(flatten)]
    pub body: RecordBody,
}

impl RecordPayload {
    pub fn inspection(title: impl Into<String>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            body: RecordBody::Inspection {
                title: title.into(),
                finalized: false,
                fields: Map::new(),
            },
        }
    }

    pub fn entry(note: Option<String>, photos: Vec<MediaRef>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            body: RecordBody::Entry {
                note,
                photos,
                fields: Map::new(),
            },
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self.body {
            RecordBody::Inspection { .. } => EntityKind::Inspection,
            RecordBody::Entry { .. } => EntityKind::Entry,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.body, RecordBody::Inspection { finalized: true, .. })
    }

    pub fn finalize(&mut self) {
        if let RecordBody::Inspection { finalized, .. } = &mut self.body {
            *finalized = true;
        }
    }

    pub fn photos(&self) -> &[MediaRef] {
        match &self.body {
            RecordBody::Entry { photos, .. } => photos,
            RecordBody::Inspection { .. } => &[],
        }
    }

    pub fn photos_mut(&mut self) -> Option<&mut Vec<MediaRef>> {
        match &mut self.body {
            RecordBody::Entry { photos, .. } => Some(photos),
            RecordBody::Inspection { .. } => None,
        }
    }

    /// ローカル参照のまま残っている写真数。未解決参照が残る限りレコードは `pending` に留まる。
    pub fn unresolved_media_count(&self) -> usize {
        self.photos()
            .iter()
            .filter(|media_ref| !media_ref.is_remote())
            .count()
    }

    pub fn to_value(&self) -> Result<Value, String> {
        serde_json::to_value(self).map_err(|e| format!("Payload cannot be serialized: {e}"))
    }

    pub fn from_value(value: &Value) -> Result<Self, String> {
        serde_json::from_value(value.clone()).map_err(|e| format!("Invalid record payload: {e}"))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Invalid record payload: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_through_json() {
        let payload = RecordPayload::entry(
            Some("draft1".to_string()),
            vec![MediaRef::new("/data/media/p1.jpg".to_string()).unwrap()],
        );
        let value = payload.to_value().unwrap();
        assert_eq!(value.get("kind").and_then(Value::as_str), Some("entry"));
        assert_eq!(value.get("note").and_then(Value::as_str), Some("draft1"));

        let parsed = RecordPayload::from_value(&value).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn unresolved_media_counts_local_refs_only() {
        let payload = RecordPayload::entry(
            None,
            vec![
                MediaRef::new("https://cdn/p1.jpg".to_string()).unwrap(),
                MediaRef::new("/data/media/p2.jpg".to_string()).unwrap(),
            ],
        );
        assert_eq!(payload.unresolved_media_count(), 1);
    }

    #[test]
    fn finalize_marks_inspection_terminal() {
        let mut payload = RecordPayload::inspection("Site A");
        assert!(!payload.is_finalized());
        payload.finalize();
        assert!(payload.is_finalized());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let value = serde_json::json!({"schemaVersion": 1, "kind": "widget"});
        assert!(RecordPayload::from_value(&value).is_err());
    }
}
