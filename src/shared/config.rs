use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicyKind {
    /// 競合を手動解決のために表面化させる（既定値）。
    #[default]
    Manual,
    /// タイムスタンプの新しい側を自動採用する。
    LastWriterWins,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connectivity_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub auto_sync: bool,
    pub sync_interval: u64,
    pub max_retries: u32,
    pub backoff_base_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub media_concurrency: usize,
    #[serde(default)]
    pub conflict_policy: ConflictPolicyKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub data_dir: String,
    pub max_file_size: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/fieldsync.db".to_string(),
                max_connections: 5,
                connection_timeout: 30,
            },
            remote: RemoteConfig {
                base_url: "https://api.example.com".to_string(),
                timeout_secs: 60,
                connectivity_timeout_secs: 5,
            },
            sync: SyncConfig {
                auto_sync: true,
                sync_interval: 300, // 5 minutes
                max_retries: 3,
                backoff_base_delay_ms: 5_000,
                backoff_multiplier: 2.0,
                media_concurrency: 3,
                conflict_policy: ConflictPolicyKind::Manual,
            },
            media: MediaConfig {
                data_dir: default_data_dir(),
                max_file_size: 50 * 1024 * 1024, // 50MB
            },
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("fieldsync"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .into_owned()
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("FIELDSYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v;
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_REMOTE_BASE_URL") {
            if !v.trim().is_empty() {
                cfg.remote.base_url = v;
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_REMOTE_TIMEOUT_SECS") {
            if let Some(value) = parse_u64(&v) {
                cfg.remote.timeout_secs = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Ok(v) = std::env::var("FIELDSYNC_SYNC_INTERVAL") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.sync_interval = value.max(1);
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_MAX_RETRIES") {
            if let Some(value) = parse_u64(&v) {
                cfg.sync.max_retries = value.min(u32::MAX as u64) as u32;
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_CONFLICT_POLICY") {
            match v.trim().to_ascii_lowercase().as_str() {
                "manual" => cfg.sync.conflict_policy = ConflictPolicyKind::Manual,
                "lww" | "last_writer_wins" => {
                    cfg.sync.conflict_policy = ConflictPolicyKind::LastWriterWins;
                }
                _ => {}
            }
        }
        if let Ok(v) = std::env::var("FIELDSYNC_DATA_DIR") {
            if !v.trim().is_empty() {
                cfg.media.data_dir = v;
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.remote.base_url.trim().is_empty() {
            return Err("Remote base_url must not be empty".to_string());
        }
        if self.remote.timeout_secs == 0 {
            return Err("Remote timeout_secs must be greater than 0".to_string());
        }
        if self.sync.media_concurrency == 0 {
            return Err("Sync media_concurrency must be greater than 0".to_string());
        }
        if self.sync.backoff_multiplier < 1.0 {
            return Err("Sync backoff_multiplier must be at least 1.0".to_string());
        }
        if self.media.data_dir.trim().is_empty() {
            return Err("Media data_dir must not be empty".to_string());
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_media_concurrency() {
        let mut cfg = AppConfig::default();
        cfg.sync.media_concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parse_bool_accepts_common_forms() {
        assert!(parse_bool("yes", false));
        assert!(!parse_bool("off", true));
        assert!(parse_bool("garbage", true));
    }
}
