pub mod conflict;
pub mod entities;
pub mod value_objects;

pub use conflict::{
    assess, ConflictAssessment, ConflictPair, ConflictPolicy, LastWriterWinsPolicy, ManualPolicy,
    Resolution,
};
pub use entities::{MediaAsset, QueueOperation, QueueOperationDraft, Record, RemoteEntity,
    RemoteWriteAck, SyncReport};
pub use value_objects::{
    EntityKind, MediaId, MediaRef, OperationType, OwnerRef, QueueId, RecordId, RecordPayload,
    SyncStatus, SyncTrigger, UploadStatus,
};
