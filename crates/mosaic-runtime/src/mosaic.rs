//! The public orchestrator facade.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use mosaic_assets::{AssetResolver, FetchSettings, Fetcher, HttpFetcher};
use mosaic_core::{AppDescriptor, AppName, LifecycleStatus};
use mosaic_events::{
    DEFAULT_CHANNEL_CAPACITY, EventBus, EventMetadata, EventReceiver, GlobalState, MosaicEvent,
    StateListenerId, StateMap,
};
use mosaic_sandbox::{GlobalScope, HostGlobals, InertEngine, ScriptEngine};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::document::{DocumentHost, MemoryDocument};
use crate::error::{RuntimeError, RuntimeResult};
use crate::navigation::{History, MemoryHistory, NavigationInterceptor, RouteListenerId};
use crate::orchestrator::{AppStatus, Orchestrator, OrchestratorContext, RouteOutcome};
use crate::registry::AppRegistry;

/// Default upper bound for a single lifecycle hook.
pub const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for [`Mosaic`].
///
/// Every collaborator has an in-memory or inert default, except the fetcher
/// which defaults to an HTTP client built from [`FetchSettings`].
pub struct MosaicBuilder {
    fetcher: Option<Arc<dyn Fetcher>>,
    fetch_settings: FetchSettings,
    engine: Arc<dyn ScriptEngine>,
    document: Arc<dyn DocumentHost>,
    history: Arc<dyn History>,
    host: Arc<HostGlobals>,
    lifecycle_timeout: Duration,
    event_capacity: usize,
}

impl std::fmt::Debug for MosaicBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MosaicBuilder")
            .field("engine", &self.engine.name())
            .field("lifecycle_timeout", &self.lifecycle_timeout)
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

impl Default for MosaicBuilder {
    fn default() -> Self {
        Self {
            fetcher: None,
            fetch_settings: FetchSettings::default(),
            engine: Arc::new(InertEngine),
            document: Arc::new(MemoryDocument::new()),
            history: Arc::new(MemoryHistory::default()),
            host: Arc::new(HostGlobals::new()),
            lifecycle_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl MosaicBuilder {
    /// Start from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `fetcher` for every network request.
    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Settings for the default HTTP fetcher. Ignored when a fetcher is set.
    #[must_use]
    pub fn fetch_settings(mut self, settings: FetchSettings) -> Self {
        self.fetch_settings = settings;
        self
    }

    /// Script engine used to evaluate application scripts.
    #[must_use]
    pub fn engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Host document receiving markup and styles.
    #[must_use]
    pub fn document(mut self, document: Arc<dyn DocumentHost>) -> Self {
        self.document = document;
        self
    }

    /// Navigation history to intercept.
    #[must_use]
    pub fn history(mut self, history: Arc<dyn History>) -> Self {
        self.history = history;
        self
    }

    /// The host's true global context.
    #[must_use]
    pub fn host_globals(mut self, host: Arc<HostGlobals>) -> Self {
        self.host = host;
        self
    }

    /// Upper bound for each bootstrap, mount and unmount hook.
    #[must_use]
    pub fn lifecycle_timeout(mut self, timeout: Duration) -> Self {
        self.lifecycle_timeout = timeout;
        self
    }

    /// Event bus channel capacity.
    #[must_use]
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Setup`] if the default HTTP fetcher cannot be built.
    pub fn build(self) -> RuntimeResult<Mosaic> {
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let client = HttpFetcher::new(&self.fetch_settings)
                    .map_err(|e| RuntimeError::Setup(e.to_string()))?;
                Arc::new(client)
            },
        };

        let events = EventBus::with_capacity(self.event_capacity);
        let global_state = Arc::new(GlobalState::with_event_bus(events.clone()));
        let ctx = OrchestratorContext {
            registry: RwLock::new(AppRegistry::new()),
            resolver: AssetResolver::new(fetcher),
            engine: self.engine,
            document: self.document,
            scope: GlobalScope::new(self.host),
            events,
            global_state,
            lifecycle_timeout: self.lifecycle_timeout,
        };
        debug!(
            engine = ctx.engine.name(),
            lifecycle_timeout = ?ctx.lifecycle_timeout,
            "Built orchestrator"
        );

        Ok(Mosaic {
            orchestrator: Arc::new(Orchestrator::new(Arc::new(ctx))),
            navigation: Arc::new(NavigationInterceptor::new(self.history)),
            driver: Mutex::new(None),
        })
    }
}

/// Progress of the route driver.
#[derive(Debug, Clone, Default)]
struct Settled {
    processed: u64,
    outcome: Option<Arc<RouteOutcome>>,
}

struct RouteDriver {
    requested: Arc<AtomicU64>,
    settled: watch::Receiver<Settled>,
    listener: RouteListenerId,
    task: JoinHandle<()>,
}

/// A micro-frontend orchestrator.
///
/// Register applications, call [`start`](Self::start), then navigate. Route
/// notifications are processed one at a time by a background driver; bursts
/// collapse onto the latest path.
pub struct Mosaic {
    orchestrator: Arc<Orchestrator>,
    navigation: Arc<NavigationInterceptor>,
    driver: Mutex<Option<RouteDriver>>,
}

impl std::fmt::Debug for Mosaic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mosaic")
            .field("started", &self.is_started())
            .field("active", &self.active_app())
            .finish_non_exhaustive()
    }
}

impl Mosaic {
    /// Start configuring an orchestrator.
    #[must_use]
    pub fn builder() -> MosaicBuilder {
        MosaicBuilder::new()
    }

    /// Register an application.
    ///
    /// Registering after [`start`](Self::start) does not re-evaluate the
    /// current route.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::DuplicateName`] if the name is taken.
    pub fn register_application(&self, descriptor: AppDescriptor) -> RuntimeResult<()> {
        self.orchestrator
            .context()
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(descriptor)
            .map(|_| ())
    }

    /// Begin intercepting navigation and activate the application matching
    /// the current path.
    ///
    /// Returns the outcome of that first route evaluation, or `None` if the
    /// orchestrator was already started.
    ///
    /// # Panics
    ///
    /// Must be called within a Tokio runtime.
    pub async fn start(&self) -> Option<Arc<RouteOutcome>> {
        let (requested, settled) = {
            let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
            if driver.is_some() {
                debug!("Already started");
                return None;
            }

            let (tx, rx) = mpsc::unbounded_channel::<(u64, String)>();
            let (settled_tx, settled_rx) = watch::channel(Settled::default());
            let requested = Arc::new(AtomicU64::new(0));

            let counter = Arc::clone(&requested);
            let listener = self.navigation.subscribe(Arc::new(move |path: &str| {
                let seq = counter.fetch_add(1, Ordering::AcqRel).saturating_add(1);
                if tx.send((seq, path.to_string())).is_err() {
                    warn!(path, "Route driver has stopped, dropping navigation");
                }
            }));
            let task = tokio::spawn(drive_routes(
                Arc::clone(&self.orchestrator),
                rx,
                settled_tx,
            ));

            *driver = Some(RouteDriver {
                requested: Arc::clone(&requested),
                settled: settled_rx.clone(),
                listener,
                task,
            });
            (requested, settled_rx)
        };

        self.navigation.start();
        self.navigation.dispatch_pop_state();
        let outcome = wait_until(settled, requested.load(Ordering::Acquire))
            .await
            .ok()
            .flatten();

        let registered = self.orchestrator.context().registry().len();
        info!(registered, "Orchestrator started");
        self.orchestrator
            .context()
            .events
            .publish(MosaicEvent::Started {
                metadata: EventMetadata::new("mosaic"),
                registered,
            });
        outcome
    }

    /// Whether [`start`](Self::start) has run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.navigation.is_started()
    }

    /// Push `path` onto the history and wait for the route to settle.
    ///
    /// When navigations race, the outcome returned is that of the latest
    /// path processed.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotStarted`] before [`start`](Self::start), or the
    /// load or mount failure of the matched application.
    pub async fn navigate_to(&self, path: &str) -> RuntimeResult<Arc<RouteOutcome>> {
        let (requested, settled) = self.driver_handles()?;
        self.navigation.push_state(path);
        let outcome = wait_until(settled, requested.load(Ordering::Acquire))
            .await?
            .ok_or(RuntimeError::Shutdown)?;
        match &outcome.activation_error {
            Some(err) => Err(err.clone()),
            None => Ok(outcome),
        }
    }

    /// Wait until every navigation issued so far has been processed.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::NotStarted`] before [`start`](Self::start) and
    /// [`RuntimeError::Shutdown`] if the driver stopped.
    pub async fn settle(&self) -> RuntimeResult<Option<Arc<RouteOutcome>>> {
        let (requested, settled) = self.driver_handles()?;
        wait_until(settled, requested.load(Ordering::Acquire)).await
    }

    /// Load an application without mounting it.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::UnknownApp`] or [`RuntimeError::Load`].
    pub async fn preload(&self, name: &str) -> RuntimeResult<()> {
        self.orchestrator.preload(name).await
    }

    /// Merge `partial` into the global state. Returns the changed keys.
    pub fn set_global_state(&self, partial: StateMap) -> Vec<String> {
        self.global_state().set_global_state(partial)
    }

    /// Snapshot of the global state.
    #[must_use]
    pub fn get_global_state(&self) -> StateMap {
        self.global_state().get_global_state()
    }

    /// Register a host-owned global state listener.
    pub fn on_global_state_change<F>(&self, callback: F) -> StateListenerId
    where
        F: Fn(&StateMap, &StateMap) + Send + Sync + 'static,
    {
        self.global_state().on_change("host", callback)
    }

    /// The global state bus.
    #[must_use]
    pub fn global_state(&self) -> &Arc<GlobalState> {
        self.orchestrator.context().global_state()
    }

    /// Status of a registered application.
    #[must_use]
    pub fn status(&self, name: &str) -> Option<LifecycleStatus> {
        self.orchestrator.status(name)
    }

    /// The mounted application, if any.
    #[must_use]
    pub fn active_app(&self) -> Option<AppName> {
        self.orchestrator.active_app()
    }

    /// Status of every registered application.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AppStatus> {
        self.orchestrator.snapshot()
    }

    /// Subscribe to every orchestrator event.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.events().subscribe()
    }

    /// The event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        self.orchestrator.context().events()
    }

    /// The navigation interceptor.
    #[must_use]
    pub fn navigation(&self) -> &Arc<NavigationInterceptor> {
        &self.navigation
    }

    /// The switchable global scope.
    #[must_use]
    pub fn scope(&self) -> &GlobalScope {
        self.orchestrator.context().scope()
    }

    /// The host document.
    #[must_use]
    pub fn document(&self) -> &Arc<dyn DocumentHost> {
        self.orchestrator.context().document()
    }

    /// The underlying orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    fn driver_handles(&self) -> RuntimeResult<(Arc<AtomicU64>, watch::Receiver<Settled>)> {
        self.driver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|d| (Arc::clone(&d.requested), d.settled.clone()))
            .ok_or(RuntimeError::NotStarted)
    }
}

impl Drop for Mosaic {
    fn drop(&mut self) {
        let driver = self
            .driver
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(driver) = driver {
            self.navigation.unsubscribe(driver.listener);
            driver.task.abort();
        }
    }
}

/// Process route notifications one at a time, skipping superseded ones.
async fn drive_routes(
    orchestrator: Arc<Orchestrator>,
    mut rx: mpsc::UnboundedReceiver<(u64, String)>,
    settled: watch::Sender<Settled>,
) {
    while let Some((mut seq, mut path)) = rx.recv().await {
        while let Ok((next_seq, next_path)) = rx.try_recv() {
            debug!(skipped = %path, next = %next_path, "Coalescing superseded navigation");
            seq = next_seq;
            path = next_path;
        }
        let outcome = Arc::new(orchestrator.on_route_change(&path).await);
        settled.send_replace(Settled {
            processed: seq,
            outcome: Some(outcome),
        });
    }
    debug!("Route driver stopped");
}

async fn wait_until(
    mut settled: watch::Receiver<Settled>,
    target: u64,
) -> RuntimeResult<Option<Arc<RouteOutcome>>> {
    let state = settled
        .wait_for(|s| s.processed >= target)
        .await
        .map_err(|_| RuntimeError::Shutdown)?;
    Ok(state.outcome.clone())
}
