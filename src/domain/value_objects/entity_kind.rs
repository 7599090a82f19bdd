use serde::{Deserialize, Serialize};
use std::fmt;

/// キュー操作が参照するエンティティの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Inspection,
    Entry,
    Media,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Inspection => "inspection",
            EntityKind::Entry => "entry",
            EntityKind::Media => "media",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "inspection" => Ok(EntityKind::Inspection),
            "entry" => Ok(EntityKind::Entry),
            "media" => Ok(EntityKind::Media),
            other => Err(format!("Unknown entity kind: {other}")),
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, EntityKind::Inspection | EntityKind::Entry)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
