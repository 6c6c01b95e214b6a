//! Shared harness for integration tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mosaic_core::{AppName, LifecycleStatus};
use mosaic_events::{EventReceiver, MosaicEvent};
use mosaic_runtime::{MemoryDocument, Mosaic};
use mosaic_sandbox::HostGlobals;
use mosaic_test::{
    CallLog, EntryPage, RecordingApp, ScriptedEngine, StaticFetcher, entry_url,
    init_test_logging, test_descriptor,
};

/// Registered applications wired to in-memory collaborators.
///
/// Each application `x` serves a page with `<p>x</p>` markup, a `p` style
/// rule and one inline script publishing a [`RecordingApp`]'s exports.
#[allow(dead_code)]
pub struct Harness {
    pub mosaic: Mosaic,
    pub document: Arc<MemoryDocument>,
    pub host: Arc<HostGlobals>,
    pub fetcher: Arc<StaticFetcher>,
    pub log: CallLog,
    pub apps: HashMap<String, RecordingApp>,
}

#[allow(dead_code)]
impl Harness {
    /// Build and start an orchestrator with `(name, rule)` applications.
    pub async fn started(apps: &[(&str, &str)]) -> Self {
        Self::started_with(apps, ScriptedEngine::new(), HostGlobals::new()).await
    }

    /// Like [`started`](Self::started), with extra engine handlers and host
    /// globals.
    pub async fn started_with(
        apps: &[(&str, &str)],
        engine: ScriptedEngine,
        host: HostGlobals,
    ) -> Self {
        init_test_logging();
        let log = CallLog::new();
        let mut engine = engine;
        let mut fetcher = StaticFetcher::new();
        let mut recording = HashMap::new();

        for (name, _) in apps {
            let app = RecordingApp::new(name, &log);
            let register = format!("register {name}");
            let page = EntryPage::new()
                .style("p { color: red; }")
                .markup(&format!("<p>{name}</p>"))
                .inline_script(&register)
                .inline_script(&format!("setup {name}"))
                .render();
            fetcher = fetcher.with_page(&entry_url(name), page);
            engine = engine.with_app(&register, &app);
            recording.insert((*name).to_string(), app);
        }

        let document = Arc::new(MemoryDocument::new());
        let host = Arc::new(host);
        let fetcher = Arc::new(fetcher);
        let mosaic = Mosaic::builder()
            .fetcher(Arc::<StaticFetcher>::clone(&fetcher))
            .engine(Arc::new(engine))
            .document(Arc::<MemoryDocument>::clone(&document))
            .host_globals(Arc::clone(&host))
            .lifecycle_timeout(Duration::from_secs(2))
            .event_channel_capacity(4096)
            .build()
            .unwrap();
        for (name, rule) in apps {
            mosaic.register_application(test_descriptor(name, rule)).unwrap();
        }
        mosaic.start().await;

        Self {
            mosaic,
            document,
            host,
            fetcher,
            log,
            apps: recording,
        }
    }

    /// The recording app registered as `name`.
    pub fn app(&self, name: &str) -> &RecordingApp {
        &self.apps[name]
    }
}

/// Replays status events and asserts the single-active invariant after each.
///
/// Returns every `(app, from, to)` transition seen.
#[allow(dead_code)]
pub fn check_single_active(
    events: &mut EventReceiver,
) -> Vec<(AppName, LifecycleStatus, LifecycleStatus)> {
    let mut board: HashMap<AppName, LifecycleStatus> = HashMap::new();
    let mut transitions = Vec::new();
    for event in events.drain() {
        if let MosaicEvent::StatusChanged { app, from, to, .. } = event.as_ref() {
            board.insert(app.clone(), *to);
            let active = board.values().filter(|s| s.is_active()).count();
            assert!(
                active <= 1,
                "{active} applications active after {app}: {from} -> {to}"
            );
            transitions.push((app.clone(), *from, *to));
        }
    }
    transitions
}
