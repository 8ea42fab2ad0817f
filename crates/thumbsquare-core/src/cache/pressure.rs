//! Host memory-pressure notifications.
//!
//! The host (an OS callback, a browser `memory` event, a test) raises
//! pressure through a [`MemoryPressure`] handle. Listeners register with
//! [`MemoryPressure::subscribe`] and stay registered for as long as the
//! returned [`Subscription`] is alive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};

/// How urgently memory should be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressureLevel {
    /// Release a share of cached data, keeping the most recently used.
    Moderate,
    /// Release everything that can be released.
    Critical,
}

/// Receiver of pressure notifications.
pub trait PressureListener: Send + Sync {
    fn on_memory_pressure(&self, level: PressureLevel);
}

type ListenerList = Vec<(u64, Arc<dyn PressureListener>)>;

#[derive(Default)]
struct Registry {
    listeners: Mutex<ListenerList>,
    next_id: AtomicU64,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, ListenerList> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A broadcast source of memory-pressure signals.
///
/// Cloning yields another handle to the same set of listeners.
#[derive(Clone, Default)]
pub struct MemoryPressure {
    registry: Arc<Registry>,
}

impl MemoryPressure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` until the returned guard is dropped.
    #[must_use = "dropping the subscription unregisters the listener immediately"]
    pub fn subscribe(&self, listener: Arc<dyn PressureListener>) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.lock().push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `level` to every registered listener.
    ///
    /// Listeners are invoked outside the registry lock, so a listener may
    /// subscribe or unsubscribe while handling the signal.
    pub fn notify(&self, level: PressureLevel) {
        let listeners: Vec<Arc<dyn PressureListener>> = self
            .registry
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        log::debug!(
            "memory pressure {:?} delivered to {} listener(s)",
            level,
            listeners.len()
        );
        for listener in listeners {
            listener.on_memory_pressure(level);
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.registry.lock().len()
    }
}

impl std::fmt::Debug for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPressure")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Keeps a listener registered. Unregisters on drop.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().retain(|(id, _)| *id != self.id);
        }
    }
}
