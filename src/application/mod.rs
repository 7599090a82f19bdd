pub mod observer;
pub mod ports;
pub mod services;
pub mod triggers;

pub use observer::{ObserverHub, ProgressSnapshot, SyncProgressObserver};
pub use triggers::SyncScheduler;
