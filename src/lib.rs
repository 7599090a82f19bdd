// モジュール定義
pub mod application;
pub mod context;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::observer::{ObserverHub, ProgressSnapshot, SyncProgressObserver};
pub use application::services::{MediaService, RecordService, RequeueJob, SyncService};
pub use application::triggers::SyncScheduler;
pub use context::EngineContext;
pub use domain::conflict::{ConflictPolicy, LastWriterWinsPolicy, ManualPolicy, Resolution};
pub use domain::entities::{MediaAsset, QueueOperation, Record, SyncReport};
pub use domain::value_objects::{
    OwnerRef, RecordId, RecordPayload, SyncStatus, SyncTrigger, UploadStatus,
};
pub use shared::{AppConfig, AppError};

/// ログ設定の初期化。ホストアプリ側で subscriber を持つ場合は呼ばないこと。
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldsync=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
