//! The route-driven lifecycle state machine.
//!
//! Every route notification is handled to completion under one lock:
//!
//! 1. match the path against the registry,
//! 2. unmount the active application if it no longer matches, and wait for
//!    the teardown to finish,
//! 3. load the matched application on first use, then bootstrap it once and
//!    mount it.
//!
//! Failures roll the instance back and are returned in the [`RouteOutcome`];
//! they never escape as panics.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use mosaic_assets::{AssetOrigin, AssetRef, AssetResolver, AssetResult, scope_css};
use mosaic_core::{AppDescriptor, AppName, LifecycleStatus};
use mosaic_events::{EventBus, EventMetadata, GlobalState, LifecycleStage, MosaicEvent};
use mosaic_sandbox::{GlobalScope, Sandbox, Script, ScriptEngine};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::document::{DocumentHost, wrap_markup};
use crate::error::{HookFailure, RuntimeError, RuntimeResult};
use crate::lifecycle::{Lifecycles, mount_props};
use crate::registry::AppRegistry;

const EVENT_SOURCE: &str = "orchestrator";

/// Every collaborator the orchestrator needs, built once by
/// [`MosaicBuilder`](crate::MosaicBuilder).
pub struct OrchestratorContext {
    pub(crate) registry: RwLock<AppRegistry>,
    pub(crate) resolver: AssetResolver,
    pub(crate) engine: Arc<dyn ScriptEngine>,
    pub(crate) document: Arc<dyn DocumentHost>,
    pub(crate) scope: GlobalScope,
    pub(crate) events: EventBus,
    pub(crate) global_state: Arc<GlobalState>,
    pub(crate) lifecycle_timeout: Duration,
}

impl std::fmt::Debug for OrchestratorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorContext")
            .field("engine", &self.engine.name())
            .field("lifecycle_timeout", &self.lifecycle_timeout)
            .finish_non_exhaustive()
    }
}

impl OrchestratorContext {
    /// The event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The global state bus.
    #[must_use]
    pub fn global_state(&self) -> &Arc<GlobalState> {
        &self.global_state
    }

    /// The switchable global scope.
    #[must_use]
    pub fn scope(&self) -> &GlobalScope {
        &self.scope
    }

    /// The host document.
    #[must_use]
    pub fn document(&self) -> &Arc<dyn DocumentHost> {
        &self.document
    }

    /// The asset resolver.
    #[must_use]
    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Upper bound for each lifecycle hook.
    #[must_use]
    pub fn lifecycle_timeout(&self) -> Duration {
        self.lifecycle_timeout
    }

    pub(crate) fn registry(&self) -> std::sync::RwLockReadGuard<'_, AppRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// What one route notification did.
#[derive(Debug, Clone, Default)]
pub struct RouteOutcome {
    /// The path that was evaluated.
    pub path: String,
    /// The application whose rule matched, if any.
    pub matched: Option<AppName>,
    /// The application torn down, if any.
    pub unmounted: Option<AppName>,
    /// The application mounted, if any.
    pub mounted: Option<AppName>,
    /// Unmount hook failure. Teardown completed regardless.
    pub unmount_error: Option<RuntimeError>,
    /// Load or mount failure of the matched application.
    pub activation_error: Option<RuntimeError>,
}

impl RouteOutcome {
    /// Whether nothing was unmounted or mounted and nothing failed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.unmounted.is_none() && self.mounted.is_none() && self.is_ok()
    }

    /// Whether no step failed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.unmount_error.is_none() && self.activation_error.is_none()
    }
}

/// Status of one registered application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppStatus {
    /// Application name.
    pub name: AppName,
    /// Activation rule.
    pub rule: String,
    /// Current lifecycle status.
    pub status: LifecycleStatus,
}

struct AppInstance {
    descriptor: Arc<AppDescriptor>,
    sandbox: Arc<Sandbox>,
    html_body: String,
    styles: Vec<String>,
    asset_urls: Vec<Url>,
    lifecycles: Lifecycles,
    bootstrapped: bool,
}

#[derive(Default)]
struct OrchestratorState {
    instances: HashMap<AppName, AppInstance>,
    active: Option<AppName>,
}

/// Drives applications through their lifecycle in response to routes.
pub struct Orchestrator {
    ctx: Arc<OrchestratorContext>,
    state: Mutex<OrchestratorState>,
    statuses: RwLock<HashMap<AppName, LifecycleStatus>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("active", &self.active_app())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator over `ctx`.
    #[must_use]
    pub fn new(ctx: Arc<OrchestratorContext>) -> Self {
        Self {
            ctx,
            state: Mutex::new(OrchestratorState::default()),
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// The shared context.
    #[must_use]
    pub fn context(&self) -> &Arc<OrchestratorContext> {
        &self.ctx
    }

    /// Handle one route notification to completion.
    pub async fn on_route_change(&self, path: &str) -> RouteOutcome {
        let mut state = self.state.lock().await;
        self.ctx.events.publish(MosaicEvent::RouteChanged {
            metadata: EventMetadata::new(EVENT_SOURCE),
            path: path.to_string(),
        });

        let matched = self.ctx.registry().find_by_path(path).cloned();
        let mut outcome = RouteOutcome {
            path: path.to_string(),
            matched: matched.as_ref().map(|d| d.name().clone()),
            ..RouteOutcome::default()
        };

        if let Some(active) = state.active.clone() {
            if outcome.matched.as_ref() == Some(&active) {
                debug!(path, app = %active, "Route already served by the active application");
                return outcome;
            }
            outcome.unmount_error = self.unmount(&mut state, &active).await.err();
            outcome.unmounted = Some(active);
        }

        let Some(descriptor) = matched else {
            debug!(path, "No application matches route");
            return outcome;
        };

        match self.activate(&mut state, &descriptor).await {
            Ok(()) => outcome.mounted = Some(descriptor.name().clone()),
            Err(e) => {
                self.report(&e);
                outcome.activation_error = Some(e);
            },
        }
        outcome
    }

    /// Load `name` without mounting it.
    ///
    /// Does nothing if the application is already loaded.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::UnknownApp`] for unregistered names and
    /// [`RuntimeError::Load`] if loading fails.
    pub async fn preload(&self, name: &str) -> RuntimeResult<()> {
        let descriptor = self
            .ctx
            .registry()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownApp {
                name: name.to_string(),
            })?;

        let mut state = self.state.lock().await;
        if state.instances.contains_key(descriptor.name()) {
            debug!(app = %descriptor.name(), "Already loaded, nothing to preload");
            return Ok(());
        }
        let instance = self.load(&descriptor).await.inspect_err(|e| self.report(e))?;
        state
            .instances
            .insert(descriptor.name().clone(), instance);
        Ok(())
    }

    /// Current status of a registered application.
    #[must_use]
    pub fn status(&self, name: &str) -> Option<LifecycleStatus> {
        let registry = self.ctx.registry();
        let descriptor = registry.get(name)?;
        Some(self.status_of(descriptor.name()))
    }

    /// The application currently mounted, if any.
    #[must_use]
    pub fn active_app(&self) -> Option<AppName> {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(_, status)| **status == LifecycleStatus::Mounted)
            .map(|(name, _)| name.clone())
    }

    /// Status of every registered application, in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AppStatus> {
        self.ctx
            .registry()
            .iter()
            .map(|descriptor| AppStatus {
                name: descriptor.name().clone(),
                rule: descriptor.active_rule().to_string(),
                status: self.status_of(descriptor.name()),
            })
            .collect()
    }

    /// External asset locations resolved for a loaded application.
    pub async fn asset_urls(&self, name: &str) -> Option<Vec<Url>> {
        let state = self.state.lock().await;
        state
            .instances
            .iter()
            .find(|(app, _)| *app == name)
            .map(|(_, instance)| instance.asset_urls.clone())
    }

    fn status_of(&self, name: &AppName) -> LifecycleStatus {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    fn transition(&self, app: &AppName, to: LifecycleStatus) {
        let from = self
            .statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(app.clone(), to)
            .unwrap_or_default();
        if !from.can_transition_to(to) {
            warn!(app = %app, %from, %to, "Unexpected lifecycle transition");
        }
        info!(app = %app, %from, %to, "Lifecycle transition");
        self.ctx.events.publish(MosaicEvent::StatusChanged {
            metadata: EventMetadata::new(EVENT_SOURCE),
            app: app.clone(),
            from,
            to,
        });
    }

    fn report(&self, err: &RuntimeError) {
        error!(error = %err, "Application lifecycle failure");
        if let (Some(app), Some(stage)) = (err.app(), err.stage()) {
            self.ctx.events.publish(MosaicEvent::ActivationFailed {
                metadata: EventMetadata::new(EVENT_SOURCE),
                app: app.clone(),
                stage,
                error: err.to_string(),
            });
        }
    }

    async fn activate(
        &self,
        state: &mut OrchestratorState,
        descriptor: &Arc<AppDescriptor>,
    ) -> RuntimeResult<()> {
        let name = descriptor.name();
        if !state.instances.contains_key(name) {
            let instance = self.load(descriptor).await?;
            state.instances.insert(name.clone(), instance);
        }
        self.mount(state, name).await?;
        state.active = Some(name.clone());
        Ok(())
    }

    async fn load(&self, descriptor: &Arc<AppDescriptor>) -> RuntimeResult<AppInstance> {
        let name = descriptor.name();
        self.transition(name, LifecycleStatus::Loading);
        match self.build_instance(descriptor).await {
            Ok(instance) => {
                self.transition(name, LifecycleStatus::NotMounted);
                Ok(instance)
            },
            Err(source) => {
                self.transition(name, LifecycleStatus::NotLoaded);
                Err(RuntimeError::Load {
                    app: name.clone(),
                    source,
                })
            },
        }
    }

    /// Fetch every asset, then run the scripts inside a fresh sandbox.
    async fn build_instance(&self, descriptor: &Arc<AppDescriptor>) -> AssetResult<AppInstance> {
        let name = descriptor.name();
        let resolver = &self.ctx.resolver;
        let assets = resolver.load(descriptor.entry()).await?;
        for diagnostic in &assets.diagnostics {
            warn!(app = %name, error = %diagnostic, "Problem in entry markup");
        }

        let namespace = name.namespace();
        let mut styles = Vec::with_capacity(assets.styles.len());
        for style in &assets.styles {
            let css = resolver.source(style).await?;
            styles.push(scope_css(&css, &namespace));
        }

        let mut scripts = Vec::with_capacity(assets.scripts.len());
        for script in &assets.scripts {
            let source = resolver.source(script).await?;
            scripts.push(to_script(script, &source));
        }

        let sandbox = self.ctx.scope.sandbox_for(name.clone());
        if !scripts.is_empty() {
            let previous = self.ctx.scope.active();
            for script in &scripts {
                if let Err(e) = self
                    .ctx
                    .scope
                    .execute(&sandbox, self.ctx.engine.as_ref(), script)
                {
                    self.ctx.events.publish(MosaicEvent::ScriptFailed {
                        metadata: EventMetadata::new(EVENT_SOURCE),
                        app: name.clone(),
                        script: script.label(),
                        error: e.to_string(),
                    });
                }
            }
            self.ctx.scope.switch_to(previous);
        }

        let lifecycles = Lifecycles::from_exports(sandbox.exports().as_ref());
        if lifecycles.is_empty() {
            warn!(app = %name, "Application exported no lifecycle hooks");
        }

        self.ctx.events.publish(MosaicEvent::AppLoaded {
            metadata: EventMetadata::new(EVENT_SOURCE),
            app: name.clone(),
            scripts: scripts.len(),
            styles: styles.len(),
        });

        let asset_urls = assets
            .scripts
            .iter()
            .chain(&assets.styles)
            .filter_map(AssetRef::url)
            .cloned()
            .collect();

        Ok(AppInstance {
            descriptor: Arc::clone(descriptor),
            sandbox,
            html_body: assets.html_body,
            styles,
            asset_urls,
            lifecycles,
            bootstrapped: false,
        })
    }

    async fn mount(&self, state: &mut OrchestratorState, name: &AppName) -> RuntimeResult<()> {
        let Some(instance) = state.instances.get_mut(name) else {
            return Err(RuntimeError::UnknownApp {
                name: name.to_string(),
            });
        };
        let descriptor = Arc::clone(&instance.descriptor);
        self.transition(name, LifecycleStatus::Mounting);

        let markup = wrap_markup(name, &instance.html_body);
        if let Err(e) = self.ctx.document.render(descriptor.container(), &markup) {
            self.transition(name, LifecycleStatus::NotMounted);
            return Err(RuntimeError::Mount {
                app: name.clone(),
                stage: LifecycleStage::Render,
                reason: HookFailure::Render(e.to_string()),
            });
        }
        for css in &instance.styles {
            self.ctx.document.insert_style(name, css);
        }
        self.ctx
            .scope
            .switch_to(Some(Arc::clone(&instance.sandbox)));

        let props = mount_props(&descriptor, &self.ctx.global_state);
        let timeout = self.ctx.lifecycle_timeout;

        if !instance.bootstrapped {
            instance.bootstrapped = true;
            if let Err(reason) = instance
                .lifecycles
                .call(LifecycleStage::Bootstrap, &props, timeout)
                .await
            {
                return Err(self.abort_mount(instance, LifecycleStage::Bootstrap, reason));
            }
        }

        if let Err(reason) = instance
            .lifecycles
            .call(LifecycleStage::Mount, &props, timeout)
            .await
        {
            return Err(self.abort_mount(instance, LifecycleStage::Mount, reason));
        }

        self.transition(name, LifecycleStatus::Mounted);
        Ok(())
    }

    fn abort_mount(
        &self,
        instance: &AppInstance,
        stage: LifecycleStage,
        reason: HookFailure,
    ) -> RuntimeError {
        let name = instance.descriptor.name();
        self.teardown(instance);
        self.transition(name, LifecycleStatus::NotMounted);
        RuntimeError::Mount {
            app: name.clone(),
            stage,
            reason,
        }
    }

    /// Run the unmount hook, then tear down unconditionally.
    async fn unmount(&self, state: &mut OrchestratorState, name: &AppName) -> RuntimeResult<()> {
        let Some(instance) = state.instances.get(name) else {
            state.active = None;
            return Ok(());
        };
        self.transition(name, LifecycleStatus::Unmounting);

        let props = mount_props(&instance.descriptor, &self.ctx.global_state);
        let result = instance
            .lifecycles
            .call(LifecycleStage::Unmount, &props, self.ctx.lifecycle_timeout)
            .await;

        self.teardown(instance);
        self.transition(name, LifecycleStatus::NotMounted);
        state.active = None;

        result.map_err(|reason| {
            let err = RuntimeError::Unmount {
                app: name.clone(),
                reason,
            };
            self.report(&err);
            err
        })
    }

    /// Remove everything an application put into the shared environment.
    fn teardown(&self, instance: &AppInstance) {
        let name = instance.descriptor.name();
        self.ctx.document.clear(instance.descriptor.container());
        let styles = self.ctx.document.remove_styles(name);
        let listeners = self.ctx.global_state.remove_owner(name.as_str());
        if self
            .ctx
            .scope
            .active()
            .is_some_and(|active| Arc::ptr_eq(&active, &instance.sandbox))
        {
            self.ctx.scope.release();
        }
        debug!(app = %name, styles, listeners, "Torn down");
    }
}

fn to_script(asset: &AssetRef, source: &str) -> Script {
    match &asset.origin {
        AssetOrigin::External(url) => Script::external(url.as_str(), source),
        AssetOrigin::Inline { index, .. } => Script::inline(*index, source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use mosaic_sandbox::HostGlobals;
    use mosaic_test::{
        CallLog, EntryPage, Hook, RecordingApp, ScriptedEngine, StaticFetcher, TEST_CONTAINER,
        entry_url, test_descriptor,
    };

    struct Harness {
        orchestrator: Orchestrator,
        document: Arc<MemoryDocument>,
        log: CallLog,
    }

    /// Apps "a" and "b" on `/a` and `/b`, each with one inline script.
    fn harness(timeout: Duration) -> (Harness, RecordingApp, RecordingApp) {
        let log = CallLog::new();
        let a = RecordingApp::new("a", &log);
        let b = RecordingApp::new("b", &log);
        let page = |name: &str| {
            EntryPage::new()
                .markup(&format!("<p>{name}</p>"))
                .style("p { color: red; }")
                .inline_script(&format!("register {name}"))
                .render()
        };
        let fetcher = StaticFetcher::new()
            .with_page(&entry_url("a"), page("a"))
            .with_page(&entry_url("b"), page("b"));
        let engine = ScriptedEngine::new()
            .with_app("register a", &a)
            .with_app("register b", &b);
        let harness = build(fetcher, engine, &["a", "b"], timeout, log);
        (harness, a, b)
    }

    /// An orchestrator over `fetcher` and `engine` with `apps` on `/{app}`.
    fn build(
        fetcher: StaticFetcher,
        engine: ScriptedEngine,
        apps: &[&str],
        timeout: Duration,
        log: CallLog,
    ) -> Harness {
        let document = Arc::new(MemoryDocument::new());
        let events = EventBus::new();
        let mut registry = AppRegistry::new();
        for app in apps {
            registry.register(test_descriptor(app, &format!("/{app}"))).unwrap();
        }
        let ctx = OrchestratorContext {
            registry: RwLock::new(registry),
            resolver: AssetResolver::new(Arc::new(fetcher)),
            engine: Arc::new(engine),
            document: Arc::clone(&document) as Arc<dyn DocumentHost>,
            scope: GlobalScope::new(Arc::new(HostGlobals::new())),
            global_state: Arc::new(GlobalState::with_event_bus(events.clone())),
            events,
            lifecycle_timeout: timeout,
        };
        Harness {
            orchestrator: Orchestrator::new(Arc::new(ctx)),
            document,
            log,
        }
    }

    #[tokio::test]
    async fn test_route_mounts_and_switches() {
        let (h, _a, _b) = harness(Duration::from_secs(1));

        let outcome = h.orchestrator.on_route_change("/a").await;
        assert_eq!(outcome.mounted.as_ref().unwrap(), "a");
        assert_eq!(h.orchestrator.status("a"), Some(LifecycleStatus::Mounted));
        assert!(h.document.content(TEST_CONTAINER).unwrap().contains("<p>a</p>"));
        assert_eq!(h.document.styles_for("a")[0].css, ".mosaic-a p { color: red; }");

        let outcome = h.orchestrator.on_route_change("/b").await;
        assert_eq!(outcome.unmounted.as_ref().unwrap(), "a");
        assert_eq!(outcome.mounted.as_ref().unwrap(), "b");
        assert_eq!(h.orchestrator.status("a"), Some(LifecycleStatus::NotMounted));
        assert!(h.document.styles_for("a").is_empty());
        assert_eq!(h.orchestrator.active_app().unwrap(), "b");
        assert!(h.log.position("a:unmount:done").unwrap() < h.log.position("b:mount").unwrap());
    }

    #[tokio::test]
    async fn test_failing_scripts_are_contained() {
        let log = CallLog::new();
        let c = RecordingApp::new("c", &log);
        let page = EntryPage::new()
            .markup("<p>c</p>")
            .inline_script("broken")
            .inline_script("panics")
            .inline_script("register c")
            .render();
        let fetcher = StaticFetcher::new().with_page(&entry_url("c"), page);
        let engine = ScriptedEngine::new()
            .with_error("broken", "boom")
            .on("panics", |_| panic!("engine blew up"))
            .with_app("register c", &c);
        let h = build(fetcher, engine.clone(), &["c"], Duration::from_secs(1), log);
        let mut events = h.orchestrator.context().events().subscribe();

        let outcome = h.orchestrator.on_route_change("/c").await;
        assert!(outcome.is_ok());
        assert_eq!(h.orchestrator.status("c"), Some(LifecycleStatus::Mounted));
        assert_eq!(h.log.count("c", Hook::Mount), 1);
        assert_eq!(engine.executed().len(), 3);

        let mut failures = Vec::new();
        while let Some(event) = events.try_recv() {
            if let MosaicEvent::ScriptFailed { app, error, .. } = event.as_ref() {
                assert_eq!(app, "c");
                failures.push(error.clone());
            }
        }
        assert_eq!(failures.len(), 2);
        assert!(failures[0].contains("boom"));
        assert!(failures[1].contains("engine blew up"));
    }

    #[tokio::test]
    async fn test_same_app_route_is_noop() {
        let (h, _a, _b) = harness(Duration::from_secs(1));
        h.orchestrator.on_route_change("/a").await;
        let outcome = h.orchestrator.on_route_change("/a/details").await;
        assert!(outcome.is_noop());
        assert_eq!(h.log.count("a", Hook::Mount), 1);
    }

    #[tokio::test]
    async fn test_unmatched_route_unmounts_only() {
        let (h, _a, _b) = harness(Duration::from_secs(1));
        h.orchestrator.on_route_change("/a").await;
        let outcome = h.orchestrator.on_route_change("/elsewhere").await;
        assert_eq!(outcome.unmounted.as_ref().unwrap(), "a");
        assert!(outcome.mounted.is_none());
        assert!(h.orchestrator.active_app().is_none());
        assert_eq!(h.document.content(TEST_CONTAINER).unwrap(), "");
    }

    #[tokio::test]
    async fn test_mount_failure_rolls_back_and_retries() {
        let (h, a, _b) = harness(Duration::from_secs(1));
        a.fail_next(Hook::Mount);

        let outcome = h.orchestrator.on_route_change("/a").await;
        let err = outcome.activation_error.unwrap();
        assert_eq!(err.stage(), Some(LifecycleStage::Mount));
        assert_eq!(h.orchestrator.status("a"), Some(LifecycleStatus::NotMounted));
        assert!(h.orchestrator.active_app().is_none());
        assert!(h.document.styles().is_empty());

        h.orchestrator.on_route_change("/").await;
        let outcome = h.orchestrator.on_route_change("/a").await;
        assert!(outcome.is_ok());
        assert_eq!(h.log.count("a", Hook::Bootstrap), 1);
        assert_eq!(h.log.count("a", Hook::Mount), 2);
    }

    #[tokio::test]
    async fn test_unmount_failure_still_tears_down() {
        let (h, a, _b) = harness(Duration::from_secs(1));
        a.fail_always(Hook::Unmount);
        h.orchestrator.on_route_change("/a").await;

        let outcome = h.orchestrator.on_route_change("/b").await;
        assert!(matches!(outcome.unmount_error, Some(RuntimeError::Unmount { .. })));
        assert_eq!(outcome.mounted.as_ref().unwrap(), "b");
        assert_eq!(h.orchestrator.status("a"), Some(LifecycleStatus::NotMounted));
        assert!(h.document.styles_for("a").is_empty());
    }

    #[tokio::test]
    async fn test_hook_timeout() {
        let (h, a, _b) = harness(Duration::from_millis(20));
        a.delay(Hook::Bootstrap, Duration::from_millis(500));

        let outcome = h.orchestrator.on_route_change("/a").await;
        let err = outcome.activation_error.unwrap();
        assert!(err.is_timeout());
        assert_eq!(err.stage(), Some(LifecycleStage::Bootstrap));
    }

    #[tokio::test]
    async fn test_load_failure_returns_to_not_loaded() {
        let (h, _a, _b) = harness(Duration::from_secs(1));
        h.orchestrator
            .context()
            .registry
            .write()
            .unwrap()
            .register(test_descriptor("ghost", "/ghost"))
            .unwrap();

        let outcome = h.orchestrator.on_route_change("/ghost").await;
        assert!(matches!(outcome.activation_error, Some(RuntimeError::Load { .. })));
        assert_eq!(h.orchestrator.status("ghost"), Some(LifecycleStatus::NotLoaded));
    }

    #[tokio::test]
    async fn test_preload_does_not_mount() {
        let (h, _a, _b) = harness(Duration::from_secs(1));
        h.orchestrator.preload("b").await.unwrap();
        assert_eq!(h.orchestrator.status("b"), Some(LifecycleStatus::NotMounted));
        assert_eq!(h.log.count("b", Hook::Mount), 0);
        assert!(h.orchestrator.context().scope().active().is_none());

        assert!(matches!(
            h.orchestrator.preload("nope").await,
            Err(RuntimeError::UnknownApp { .. })
        ));
    }

    #[tokio::test]
    async fn test_snapshot_in_registration_order() {
        let (h, _a, _b) = harness(Duration::from_secs(1));
        h.orchestrator.on_route_change("/b").await;
        let snapshot = h.orchestrator.snapshot();
        assert_eq!(snapshot[0].name, "a");
        assert_eq!(snapshot[0].status, LifecycleStatus::NotLoaded);
        assert_eq!(snapshot[1].status, LifecycleStatus::Mounted);
        assert_eq!(snapshot[1].rule, "/b");
    }
}
