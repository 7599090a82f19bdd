pub mod entity_kind;
pub mod media_id;
pub mod media_ref;
pub mod operation_type;
pub mod owner_ref;
pub mod queue_id;
pub mod record_id;
pub mod record_payload;
pub mod sync_status;
pub mod sync_trigger;
pub mod upload_status;

pub use entity_kind::EntityKind;
pub use media_id::MediaId;
pub use media_ref::MediaRef;
pub use operation_type::OperationType;
pub use owner_ref::OwnerRef;
pub use queue_id::QueueId;
pub use record_id::RecordId;
pub use record_payload::{RecordBody, RecordPayload, CURRENT_SCHEMA_VERSION};
pub use sync_status::SyncStatus;
pub use sync_trigger::SyncTrigger;
pub use upload_status::UploadStatus;
