// Registered-listener collection with isolated dispatch
//
// Listeners are plain synchronous closures. Dispatch clones the current
// list before invoking anything, so a listener may register or remove
// listeners (including itself) while being called. A panicking listener is
// caught and logged; delivery continues with the next one.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::error;

/// Handle returned by registration, used to unregister later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct ListenerSet<T> {
    name: &'static str,
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Listener<T>)>>,
}

impl<T> ListenerSet<T> {
    /// `name` only shows up in log lines
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn register<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Returns `true` if the listener was registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut guard = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|(existing, _)| *existing != id);
        guard.len() != before
    }

    pub fn clear(&self) {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `value` to every listener registered at call time.
    ///
    /// Returns the number of listeners that panicked.
    pub fn dispatch(&self, value: &T) -> usize {
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        let mut failures = 0;
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
                failures += 1;
                error!("❌ {} listener panicked; continuing delivery", self.name);
            }
        }
        failures
    }
}

impl<T> std::fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerSet")
            .field("name", &self.name)
            .field("listeners", &self.len())
            .finish()
    }
}
