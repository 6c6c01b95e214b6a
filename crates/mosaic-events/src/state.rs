//! Global state bus: a shared key/value store with change notification.
//!
//! This is the intentional cross-application channel. It is distinct from
//! sandbox state, which is private per application.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::event::{EventMetadata, MosaicEvent};

/// The state shape: a flat JSON object.
pub type StateMap = serde_json::Map<String, Value>;

type Listener = Arc<dyn Fn(&StateMap, &StateMap) + Send + Sync>;

/// Handle returned by [`GlobalState::on_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateListenerId(u64);

struct ListenerEntry {
    owner: String,
    callback: Listener,
}

/// Shared key/value store reachable from every application.
///
/// Writes merge shallowly, last write wins per key. Reads return copies.
#[derive(Default)]
pub struct GlobalState {
    state: RwLock<StateMap>,
    listeners: RwLock<HashMap<StateListenerId, ListenerEntry>>,
    next_id: AtomicU64,
    bus: Option<EventBus>,
}

impl fmt::Debug for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("GlobalState")
            .field("keys", &self.snapshot().len())
            .field("listeners", &listeners)
            .finish_non_exhaustive()
    }
}

impl GlobalState {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that also publishes
    /// [`MosaicEvent::GlobalStateChanged`] on `bus`.
    #[must_use]
    pub fn with_event_bus(bus: EventBus) -> Self {
        Self {
            bus: Some(bus),
            ..Self::default()
        }
    }

    /// Merge `partial` into the store and notify listeners.
    ///
    /// Keys whose value is unchanged are ignored; when nothing changes no
    /// listener runs. Returns the keys that changed.
    pub fn set_global_state(&self, partial: StateMap) -> Vec<String> {
        let (previous, current, changed) = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let previous = state.clone();
            let mut changed = Vec::new();
            for (key, value) in partial {
                if state.get(&key) != Some(&value) {
                    changed.push(key.clone());
                    state.insert(key, value);
                }
            }
            (previous, state.clone(), changed)
        };

        if changed.is_empty() {
            debug!("Global state write had no effect");
            return changed;
        }

        debug!(keys = ?changed, "Global state changed");
        self.notify(&current, &previous);

        if let Some(bus) = &self.bus {
            bus.publish(MosaicEvent::GlobalStateChanged {
                metadata: EventMetadata::new("global_state"),
                keys: changed.clone(),
            });
        }
        changed
    }

    /// Copy of the current state. Mutating the result never affects the store.
    #[must_use]
    pub fn get_global_state(&self) -> StateMap {
        self.snapshot()
    }

    /// Register a change listener owned by `owner`.
    ///
    /// The callback receives `(state, previous)` after every effective write.
    pub fn on_change<F>(&self, owner: impl Into<String>, callback: F) -> StateListenerId
    where
        F: Fn(&StateMap, &StateMap) + Send + Sync + 'static,
    {
        let id = StateListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let owner = owner.into();
        debug!(owner = %owner, "Global state listener registered");
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                ListenerEntry {
                    owner,
                    callback: Arc::new(callback),
                },
            );
        id
    }

    /// Remove one listener. Returns `true` if it existed.
    pub fn off_change(&self, id: StateListenerId) -> bool {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// Remove every listener registered by `owner`. Returns how many were removed.
    pub fn remove_owner(&self, owner: &str) -> usize {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|_, entry| entry.owner != owner);
        before.saturating_sub(listeners.len())
    }

    /// Whether listener `id` is still registered.
    #[must_use]
    pub fn is_listening(&self, id: StateListenerId) -> bool {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn snapshot(&self) -> StateMap {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn notify(&self, current: &StateMap, previous: &StateMap) {
        // Clone callbacks out so a listener may (un)register without deadlocking.
        let callbacks: Vec<(String, Listener)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| (entry.owner.clone(), Arc::clone(&entry.callback)))
            .collect();

        for (owner, callback) in callbacks {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(current, previous);
            }));
            if result.is_err() {
                warn!(owner = %owner, "Global state listener panicked");
            }
        }
    }
}
