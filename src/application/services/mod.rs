pub mod media_service;
pub mod record_service;
pub mod requeue_job;
pub mod sync_service;

#[cfg(test)]
pub mod test_support;

pub use media_service::{MediaBatchReport, MediaService};
pub use record_service::RecordService;
pub use requeue_job::{RequeueJob, RequeueReport};
pub use sync_service::{BackoffPolicy, SyncService};
