//! Shared global state between the host and mounted applications.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::Harness;
use mosaic_sandbox::{HostFunction, Value};
use mosaic_test::Hook;
use serde_json::json;

type Seen = Arc<Mutex<Vec<serde_json::Value>>>;

/// Keep the props `app` receives on mount.
fn capture_props(h: &Harness, app: &str) -> Arc<Mutex<Option<Value>>> {
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);
    h.app(app).probe(Hook::Mount, move |args| {
        *sink.lock().unwrap() = args.first().cloned();
    });
    slot
}

async fn call(props: &Value, name: &str, args: Vec<Value>) -> Value {
    props
        .get(name)
        .and_then(Value::as_function)
        .unwrap()
        .call(args)
        .await
        .unwrap()
}

fn recorder(seen: &Seen) -> Value {
    let seen = Arc::clone(seen);
    Value::Function(HostFunction::sync("listener", move |args| {
        seen.lock().unwrap().push(args[0].to_json());
        Ok(Value::Null)
    }))
}

async fn deliver() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn test_apps_share_state_with_host() {
    let h = Harness::started(&[("a", "/a"), ("b", "/b")]).await;
    let a_props = capture_props(&h, "a");
    let b_props = capture_props(&h, "b");

    h.mosaic.set_global_state(json!({"user": "ada"}).as_object().unwrap().clone());

    h.mosaic.navigate_to("/a").await.unwrap();
    let props = a_props.lock().unwrap().clone().unwrap();
    let state = call(&props, "getGlobalState", vec![]).await;
    assert_eq!(state.to_json(), json!({"user": "ada"}));

    let changed = call(
        &props,
        "setGlobalState",
        vec![Value::from_json(json!({"cart": 2}))],
    )
    .await;
    assert_eq!(changed.to_json(), json!(["cart"]));

    h.mosaic.navigate_to("/b").await.unwrap();
    let props = b_props.lock().unwrap().clone().unwrap();
    let state = call(&props, "getGlobalState", vec![]).await;
    assert_eq!(state.to_json(), json!({"user": "ada", "cart": 2}));
    assert_eq!(props.get("name"), Some(&Value::from("b")));
}

#[tokio::test]
async fn test_listener_removed_when_app_unmounts() {
    let h = Harness::started(&[("a", "/a"), ("b", "/b")]).await;
    let a_props = capture_props(&h, "a");
    let seen: Seen = Arc::default();

    h.mosaic.navigate_to("/a").await.unwrap();
    let props = a_props.lock().unwrap().clone().unwrap();
    call(&props, "onGlobalStateChange", vec![recorder(&seen)]).await;
    assert_eq!(h.mosaic.global_state().listener_count(), 1);

    h.mosaic.set_global_state(json!({"theme": "dark"}).as_object().unwrap().clone());
    deliver().await;
    assert_eq!(seen.lock().unwrap().clone(), vec![json!({"theme": "dark"})]);

    h.mosaic.navigate_to("/b").await.unwrap();
    assert_eq!(h.mosaic.global_state().listener_count(), 0);

    h.mosaic.set_global_state(json!({"theme": "light"}).as_object().unwrap().clone());
    deliver().await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_host_listener_outlives_app_switches() {
    let h = Harness::started(&[("a", "/a"), ("b", "/b")]).await;
    let seen: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = Arc::clone(&seen);
    h.mosaic.on_global_state_change(move |current, _| {
        if let Some(step) = current.get("step").and_then(|v| v.as_str()) {
            sink.lock().unwrap().push(step.to_string());
        }
    });

    h.mosaic.navigate_to("/a").await.unwrap();
    h.mosaic.set_global_state(json!({"step": "one"}).as_object().unwrap().clone());
    h.mosaic.navigate_to("/b").await.unwrap();
    h.mosaic.set_global_state(json!({"step": "two"}).as_object().unwrap().clone());

    assert_eq!(seen.lock().unwrap().clone(), vec!["one", "two"]);
}
