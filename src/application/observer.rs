use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// 同期パス中に配られる進捗スナップショット。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub current_operation: Option<String>,
}

pub trait SyncProgressObserver: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// 購読者のレジストリ。オーケストレータの生存期間と独立に登録・解除できる。
pub struct ObserverHub {
    observers: RwLock<HashMap<u64, Arc<dyn SyncProgressObserver>>>,
    next_id: AtomicU64,
}

impl ObserverHub {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn SyncProgressObserver>) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut guard) = self.observers.write() {
            guard.insert(id, observer);
        }
        ObserverId(id)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.observers
            .write()
            .map(|mut guard| guard.remove(&id.0).is_some())
            .unwrap_or(false)
    }

    pub fn emit(&self, snapshot: &ProgressSnapshot) {
        let observers: Vec<Arc<dyn SyncProgressObserver>> = match self.observers.read() {
            Ok(guard) => guard.values().cloned().collect(),
            Err(_) => return,
        };
        for observer in observers {
            observer.on_progress(snapshot);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().map(|guard| guard.len()).unwrap_or(0)
    }
}

impl Default for ObserverHub {
    fn default() -> Self {
        Self::new()
    }
}
