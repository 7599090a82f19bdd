pub mod media_asset;
pub mod queue_operation;
pub mod record;
pub mod remote_entity;
pub mod sync_report;

pub use media_asset::MediaAsset;
pub use queue_operation::{QueueOperation, QueueOperationDraft, DEFAULT_PRIORITY};
pub use record::{ConflictSnapshot, Record};
pub use remote_entity::{RemoteEntity, RemoteWriteAck};
pub use sync_report::SyncReport;
