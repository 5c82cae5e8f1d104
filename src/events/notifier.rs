//! Synchronous observer registry.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::events::types::ChangeEvent;

/// Handle identifying a registered observer, used to deregister it.
pub type ObserverId = u64;

type Callback = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Registry of change observers.
///
/// Observers are invoked synchronously, in registration order, on the thread
/// performing the mutation. Panics inside an observer are not caught.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: RwLock<Vec<(ObserverId, Callback)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

impl ChangeNotifier {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer and returns its handle.
    pub fn subscribe(&self, observer: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> ObserverId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.write().push((id, Box::new(observer)));
        id
    }

    /// Deregisters an observer. Returns whether it was registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Delivers `event` to every registered observer.
    pub fn emit(&self, event: &ChangeEvent) {
        for (_, observer) in self.observers.read().iter() {
            observer(event);
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}
