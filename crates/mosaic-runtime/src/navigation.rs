//! Navigation history and its interceptor.
//!
//! The [`NavigationInterceptor`] is the single owner of history mutation.
//! Every push, replace and host-originated pop turns into exactly one route
//! notification to each subscriber, delivered synchronously after the
//! history has been updated.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{debug, info, warn};

/// The host's navigation history.
pub trait History: Send + Sync {
    /// Push a new entry.
    fn push_state(&self, path: &str);

    /// Replace the current entry.
    fn replace_state(&self, path: &str);

    /// Path of the current entry.
    fn current_path(&self) -> String;

    /// Move `delta` entries back (negative) or forward (positive).
    ///
    /// Returns `true` if the current entry changed.
    fn go(&self, delta: isize) -> bool;
}

#[derive(Debug)]
struct Entries {
    stack: Vec<String>,
    index: usize,
}

/// In-memory [`History`].
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Mutex<Entries>,
}

impl MemoryHistory {
    /// Create a history whose only entry is `initial`.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(Entries {
                stack: vec![initial.into()],
                index: 0,
            }),
        }
    }

    /// Every entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.lock().stack.clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().stack.len()
    }

    /// Always `false`: a history has at least one entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().stack.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl History for MemoryHistory {
    fn push_state(&self, path: &str) {
        let mut entries = self.lock();
        let keep = entries.index.saturating_add(1);
        entries.stack.truncate(keep);
        entries.stack.push(path.to_string());
        entries.index = keep;
    }

    fn replace_state(&self, path: &str) {
        let mut entries = self.lock();
        let index = entries.index;
        if let Some(slot) = entries.stack.get_mut(index) {
            *slot = path.to_string();
        }
    }

    fn current_path(&self) -> String {
        let entries = self.lock();
        entries
            .stack
            .get(entries.index)
            .cloned()
            .unwrap_or_else(|| "/".to_string())
    }

    fn go(&self, delta: isize) -> bool {
        let mut entries = self.lock();
        let Some(target) = entries.index.checked_add_signed(delta) else {
            return false;
        };
        if delta == 0 || target >= entries.stack.len() {
            return false;
        }
        entries.index = target;
        true
    }
}

/// Receives route notifications.
pub trait RouteListener: Send + Sync {
    /// Called once per navigation with the new path.
    fn on_route_change(&self, path: &str);
}

impl<F> RouteListener for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_route_change(&self, path: &str) {
        self(path);
    }
}

/// Handle returned by [`NavigationInterceptor::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteListenerId(u64);

/// Funnels every history change through one notification point.
///
/// Before [`start`](Self::start) history calls update the history without
/// notifying anyone. Starting is idempotent.
pub struct NavigationInterceptor {
    history: Arc<dyn History>,
    started: AtomicBool,
    listeners: RwLock<Vec<(RouteListenerId, Arc<dyn RouteListener>)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for NavigationInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationInterceptor")
            .field("started", &self.is_started())
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl NavigationInterceptor {
    /// Wrap `history`.
    #[must_use]
    pub fn new(history: Arc<dyn History>) -> Self {
        Self {
            history,
            started: AtomicBool::new(false),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Begin intercepting. Returns `false` if already started.
    pub fn start(&self) -> bool {
        let first = self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            info!(path = %self.current_path(), "Navigation interception started");
        } else {
            debug!("Navigation interception already started");
        }
        first
    }

    /// Whether interception is active.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Path of the current history entry.
    #[must_use]
    pub fn current_path(&self) -> String {
        self.history.current_path()
    }

    /// Push `path` and notify.
    pub fn push_state(&self, path: &str) {
        self.history.push_state(path);
        self.notify(path);
    }

    /// Replace the current entry with `path` and notify.
    pub fn replace_state(&self, path: &str) {
        self.history.replace_state(path);
        self.notify(path);
    }

    /// Traverse the history and, if the entry changed, dispatch a pop
    /// notification. Returns `true` if the entry changed.
    pub fn go(&self, delta: isize) -> bool {
        let moved = self.history.go(delta);
        if moved {
            self.dispatch_pop_state();
        }
        moved
    }

    /// Notify about a host-originated navigation to the current entry.
    pub fn dispatch_pop_state(&self) {
        let path = self.history.current_path();
        self.notify(&path);
    }

    /// Subscribe to route notifications.
    pub fn subscribe(&self, listener: Arc<dyn RouteListener>) -> RouteListenerId {
        let id = RouteListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a subscription. Returns `true` if it existed.
    pub fn unsubscribe(&self, id: RouteListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of subscribers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn notify(&self, path: &str) {
        if !self.is_started() {
            debug!(path, "Navigation before start, not notifying");
            return;
        }
        let listeners: Vec<Arc<dyn RouteListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!(path, listeners = listeners.len(), "Route changed");
        for listener in listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_route_change(path);
            }));
            if result.is_err() {
                warn!(path, "Route listener panicked");
            }
        }
    }
}
