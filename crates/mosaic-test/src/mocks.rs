//! Mock implementations for testing.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use mosaic_assets::{AssetError, AssetResult, Fetcher};
use mosaic_sandbox::{GlobalView, HostFunction, Script, ScriptEngine, ScriptError, Value};
use url::Url;

// ---------------------------------------------------------------------------
// StaticFetcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Response {
    Body(String),
    Status(u16),
    Failure(String),
}

/// In-memory [`Fetcher`] serving canned responses by URL.
///
/// Unknown URLs answer with HTTP 404. Every request is counted.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    responses: Arc<Mutex<HashMap<String, Response>>>,
    requests: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
}

impl StaticFetcher {
    /// Create a fetcher with no pages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    #[must_use]
    pub fn with_page(self, url: &str, body: impl Into<String>) -> Self {
        self.set(url, Response::Body(body.into()));
        self
    }

    /// Answer `url` with a non-success status.
    #[must_use]
    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set(url, Response::Status(status));
        self
    }

    /// Fail `url` at the transport level.
    #[must_use]
    pub fn with_failure(self, url: &str, reason: impl Into<String>) -> Self {
        self.set(url, Response::Failure(reason.into()));
        self
    }

    /// Sleep before answering each request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the page at `url` after construction.
    pub fn set_page(&self, url: &str, body: impl Into<String>) {
        self.set(url, Response::Body(body.into()));
    }

    /// Number of requests made for `url`.
    #[must_use]
    pub fn fetch_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|requested| requested.as_str() == url)
            .count()
    }

    /// Every requested URL, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, url: &str, response: Response) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), response);
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch_text(&self, url: &Url) -> AssetResult<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url.as_str())
            .cloned();
        match response {
            Some(Response::Body(body)) => Ok(body),
            Some(Response::Status(status)) => Err(AssetError::Status {
                url: url.to_string(),
                status,
            }),
            Some(Response::Failure(reason)) => Err(AssetError::Fetch {
                url: url.to_string(),
                reason,
            }),
            None => Err(AssetError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedEngine
// ---------------------------------------------------------------------------

type Handler = Arc<dyn Fn(&GlobalView<'_>) -> Result<(), ScriptError> + Send + Sync>;

/// [`ScriptEngine`] that runs Rust closures keyed by script source.
///
/// Sources without a handler run as no-ops. Every execution is recorded as
/// `"{app}:{label}"`.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    handlers: Arc<Mutex<HashMap<String, Handler>>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl fmt::Debug for ScriptedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedEngine")
            .field("executed", &self.executed())
            .finish_non_exhaustive()
    }
}

impl ScriptedEngine {
    /// Create an engine with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `handler` whenever a script's source equals `source`.
    #[must_use]
    pub fn on<F>(self, source: &str, handler: F) -> Self
    where
        F: Fn(&GlobalView<'_>) -> Result<(), ScriptError> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.to_string(), Arc::new(handler));
        self
    }

    /// Make `source` publish `app`'s lifecycle exports under its name.
    #[must_use]
    pub fn with_app(self, source: &str, app: &RecordingApp) -> Self {
        let name = app.name().to_string();
        let exports = app.exports();
        self.on(source, move |global| {
            global
                .set(name.clone(), exports.clone())
                .map_err(|e| ScriptError::new(e.to_string()))
        })
    }

    /// Make `source` raise `message`.
    #[must_use]
    pub fn with_error(self, source: &str, message: &str) -> Self {
        let message = message.to_string();
        self.on(source, move |_| Err(ScriptError::new(message.clone())))
    }

    /// Executions so far, as `"{app}:{label}"`.
    #[must_use]
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ScriptEngine for ScriptedEngine {
    fn execute(&self, script: &Script, global: &GlobalView<'_>) -> Result<(), ScriptError> {
        let app = global
            .active_app()
            .map_or_else(|| "host".to_string(), |a| a.to_string());
        self.executed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{app}:{}", script.label()));

        let handler = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&script.source)
            .cloned();
        match handler {
            Some(handler) => handler(global),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// RecordingApp
// ---------------------------------------------------------------------------

/// A lifecycle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// `bootstrap()`
    Bootstrap,
    /// `mount(props)`
    Mount,
    /// `unmount(props)`
    Unmount,
}

impl Hook {
    /// Export key of this hook.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Mount => "mount",
            Self::Unmount => "unmount",
        }
    }
}

/// Shared, ordered log of hook calls across applications.
///
/// Entries read `"{app}:{hook}"`; a hook that finished adds a second
/// `"{app}:{hook}:done"` entry, so interleaving is observable.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: impl Into<String>) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Copy of every entry.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of times `app` entered `hook`.
    #[must_use]
    pub fn count(&self, app: &str, hook: Hook) -> usize {
        let entry = format!("{app}:{}", hook.as_str());
        self.entries().iter().filter(|e| **e == entry).count()
    }

    /// Position of the first occurrence of `entry`.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    /// Forget every entry.
    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

type Probe = Arc<dyn Fn(&[Value]) + Send + Sync>;

#[derive(Default)]
struct Behaviour {
    fail_once: HashSet<Hook>,
    fail_always: HashSet<Hook>,
    delays: HashMap<Hook, Duration>,
    probes: HashMap<Hook, Probe>,
}

/// An application whose lifecycle exports record every call.
#[derive(Clone)]
pub struct RecordingApp {
    name: String,
    log: CallLog,
    behaviour: Arc<Mutex<Behaviour>>,
}

impl fmt::Debug for RecordingApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingApp")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl RecordingApp {
    /// Create an application named `name` logging into `log`.
    #[must_use]
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            behaviour: Arc::new(Mutex::new(Behaviour::default())),
        }
    }

    /// The application name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make the next call of `hook` fail.
    pub fn fail_next(&self, hook: Hook) {
        self.behaviour().fail_once.insert(hook);
    }

    /// Make every call of `hook` fail.
    pub fn fail_always(&self, hook: Hook) {
        self.behaviour().fail_always.insert(hook);
    }

    /// Stop failing `hook`.
    pub fn heal(&self, hook: Hook) {
        let mut behaviour = self.behaviour();
        behaviour.fail_once.remove(&hook);
        behaviour.fail_always.remove(&hook);
    }

    /// Suspend for `delay` inside `hook`.
    pub fn delay(&self, hook: Hook, delay: Duration) {
        self.behaviour().delays.insert(hook, delay);
    }

    /// Run `probe` with the hook arguments whenever `hook` is entered.
    pub fn probe<F>(&self, hook: Hook, probe: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.behaviour().probes.insert(hook, Arc::new(probe));
    }

    /// Lifecycle exports: an object with `bootstrap`, `mount` and `unmount`.
    #[must_use]
    pub fn exports(&self) -> Value {
        Value::object(
            [Hook::Bootstrap, Hook::Mount, Hook::Unmount].map(|hook| (hook.as_str(), self.hook(hook))),
        )
    }

    fn hook(&self, hook: Hook) -> Value {
        let app = self.clone();
        let function = HostFunction::new(format!("{}.{}", self.name, hook.as_str()), move |args| {
            let app = app.clone();
            async move { app.run(hook, args).await }
        });
        Value::Function(function)
    }

    async fn run(&self, hook: Hook, args: Vec<Value>) -> Result<Value, ScriptError> {
        let label = format!("{}:{}", self.name, hook.as_str());
        self.log.push(label.clone());

        let (probe, delay, fail) = {
            let mut behaviour = self.behaviour();
            let fail = behaviour.fail_once.remove(&hook) || behaviour.fail_always.contains(&hook);
            (
                behaviour.probes.get(&hook).cloned(),
                behaviour.delays.get(&hook).copied(),
                fail,
            )
        };

        if let Some(probe) = probe {
            probe(&args);
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(ScriptError::new(format!("{label} failed")));
        }
        self.log.push(format!("{label}:done"));
        Ok(Value::Null)
    }

    fn behaviour(&self) -> std::sync::MutexGuard<'_, Behaviour> {
        self.behaviour
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
