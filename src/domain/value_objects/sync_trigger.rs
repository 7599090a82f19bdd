use serde::{Deserialize, Serialize};
use std::fmt;

/// 同期パスの起動契機。すべて同じシングルフライト入口へ合流する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Foreground,
    ConnectivityRegained,
    Interval,
    Manual,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Foreground => "foreground",
            SyncTrigger::ConnectivityRegained => "connectivity_regained",
            SyncTrigger::Interval => "interval",
            SyncTrigger::Manual => "manual",
        }
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
