//! Per-instance mutual exclusion.
//!
//! Requests for different instances never wait on each other. Requests for
//! the same instance run one at a time, so of two racing provisions the
//! second always observes the first one's namespace and fails with `Conflict`.

use futures::lock::{Mutex, OwnedMutexGuard};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, Weak};

/// Hands out one async lock per instance identifier
#[derive(Default)]
pub struct InstanceGuard {
    locks: StdMutex<HashMap<String, Weak<Mutex<()>>>>,
}

/// Held while an operation on an instance runs
pub struct InstanceLock {
    _guard: OwnedMutexGuard<()>,
}

impl InstanceGuard {
    /// Create an empty guard
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other operation holds `instance_id`, then hold it
    pub async fn lock(&self, instance_id: &str) -> InstanceLock {
        let mutex = self.mutex_for(instance_id);
        InstanceLock {
            _guard: mutex.lock_owned().await,
        }
    }

    fn mutex_for(&self, instance_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Forget instances nobody is waiting on.
        locks.retain(|_, lock| lock.strong_count() > 0);

        if let Some(mutex) = locks.get(instance_id).and_then(Weak::upgrade) {
            return mutex;
        }
        let mutex = Arc::new(Mutex::new(()));
        locks.insert(instance_id.to_string(), Arc::downgrade(&mutex));
        mutex
    }

    /// Number of instances currently locked or awaited
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|lock| lock.strong_count() > 0)
            .count()
    }
}
