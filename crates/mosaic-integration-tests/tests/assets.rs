//! Entry documents served over HTTP, resolved, executed and styled.

use std::sync::Arc;

use mosaic_core::{AppDescriptor, LifecycleStatus};
use mosaic_runtime::{MemoryDocument, Mosaic};
use mosaic_test::{CallLog, EntryPage, RecordingApp, ScriptedEngine, TEST_CONTAINER};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

struct Served {
    server: MockServer,
    mosaic: Mosaic,
    document: Arc<MemoryDocument>,
    engine: ScriptedEngine,
}

async fn served_app(page: &str) -> Served {
    mosaic_test::init_test_logging();
    let server = MockServer::start().await;
    serve(&server, "/a/", page).await;
    serve(&server, "/a/lib.js", "lib").await;
    serve(&server, "/shared/vendor.js", "register").await;
    serve(&server, "/a/theme.css", ".card { padding: 0; }").await;

    let log = CallLog::new();
    let app = RecordingApp::new("a", &log);
    let engine = ScriptedEngine::new().with_app("register", &app);
    let document = Arc::new(MemoryDocument::new());
    let mosaic = Mosaic::builder()
        .engine(Arc::new(engine.clone()))
        .document(Arc::<MemoryDocument>::clone(&document))
        .build()
        .unwrap();

    let entry = format!("{}/a/", server.uri());
    mosaic
        .register_application(AppDescriptor::new("a", &entry, TEST_CONTAINER, "/a").unwrap())
        .unwrap();
    mosaic.start().await;

    Served {
        server,
        mosaic,
        document,
        engine,
    }
}

fn page() -> String {
    EntryPage::new()
        .stylesheet("theme.css")
        .style(".btn { color: red; }\n@media print { .btn { color: black; } }")
        .markup("<main>orders</main>")
        .external_script("lib.js")
        .external_script("/shared/vendor.js")
        .inline_script("boot")
        .render()
}

#[tokio::test]
async fn test_scripts_run_in_document_order_with_resolved_urls() {
    let s = served_app(&page()).await;

    s.mosaic.navigate_to("/a").await.unwrap();
    assert_eq!(s.mosaic.status("a"), Some(LifecycleStatus::Mounted));

    let base = s.server.uri();
    let executed = s.engine.executed();
    assert_eq!(executed.len(), 3, "executed: {executed:?}");
    assert_eq!(executed[0], format!("a:{base}/a/lib.js"));
    assert_eq!(executed[1], format!("a:{base}/shared/vendor.js"));
    assert!(executed[2].starts_with("a:inline#"));

    let urls: Vec<String> = s
        .mosaic
        .orchestrator()
        .asset_urls("a")
        .await
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        urls,
        vec![
            format!("{base}/a/lib.js"),
            format!("{base}/shared/vendor.js"),
            format!("{base}/a/theme.css"),
        ]
    );
}

#[tokio::test]
async fn test_styles_are_scoped_and_removed_on_unmount() {
    let s = served_app(&page()).await;

    s.mosaic.navigate_to("/a").await.unwrap();
    let css: Vec<String> = s
        .document
        .styles_for("a")
        .into_iter()
        .map(|node| node.css)
        .collect();
    assert_eq!(css.len(), 2);
    assert_eq!(css[0], ".mosaic-a .card { padding: 0; }");
    assert!(css[1].starts_with(".mosaic-a .btn { color: red; }"));
    assert!(css[1].contains("@media print { .btn { color: black; } }"));

    let body = s.document.content(TEST_CONTAINER).unwrap();
    assert!(body.contains("<main>orders</main>"));

    s.mosaic.navigate_to("/").await.unwrap();
    assert!(s.document.styles_for("a").is_empty());
    assert!(s.document.content(TEST_CONTAINER).unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_missing_script_aborts_load_before_execution() {
    let page = EntryPage::new()
        .external_script("lib.js")
        .external_script("missing.js")
        .inline_script("boot")
        .render();
    let s = served_app(&page).await;

    let err = s.mosaic.navigate_to("/a").await.unwrap_err();

    assert!(err.to_string().contains("missing.js"), "{err}");
    assert!(s.engine.executed().is_empty());
    assert_eq!(s.mosaic.status("a"), Some(LifecycleStatus::NotLoaded));
}
