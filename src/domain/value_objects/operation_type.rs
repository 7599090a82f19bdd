use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Create,
    Update,
    Delete,
    UploadMedia,
    FinalizeParent,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::UploadMedia => "upload_media",
            OperationType::FinalizeParent => "finalize_parent",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "create" => Ok(OperationType::Create),
            "update" => Ok(OperationType::Update),
            "delete" => Ok(OperationType::Delete),
            "upload_media" => Ok(OperationType::UploadMedia),
            "finalize_parent" => Ok(OperationType::FinalizeParent),
            other => Err(format!("Unknown operation type: {other}")),
        }
    }

    /// 同一エンティティ宛の既存操作へ合流できるか。`update` のみが合流対象。
    pub fn coalesces(&self) -> bool {
        matches!(self, OperationType::Update)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
