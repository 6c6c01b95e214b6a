//! Lifecycle hooks exported by applications.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use mosaic_core::AppDescriptor;
use mosaic_events::{GlobalState, LifecycleStage};
use mosaic_sandbox::{HostFunction, ScriptError, Value};
use tracing::{debug, warn};

use crate::error::HookFailure;

/// The hooks an application exported under its name.
///
/// A missing hook is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Lifecycles {
    bootstrap: Option<HostFunction>,
    mount: Option<HostFunction>,
    unmount: Option<HostFunction>,
}

impl Lifecycles {
    /// Extract hooks from an exports object.
    #[must_use]
    pub fn from_exports(exports: Option<&Value>) -> Self {
        let hook = |key: &str| {
            exports
                .and_then(|e| e.get(key))
                .and_then(Value::as_function)
                .cloned()
        };
        Self {
            bootstrap: hook("bootstrap"),
            mount: hook("mount"),
            unmount: hook("unmount"),
        }
    }

    /// Whether no hook was exported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bootstrap.is_none() && self.mount.is_none() && self.unmount.is_none()
    }

    /// Run the hook for `stage` with `props`, bounded by `timeout`.
    ///
    /// Stages without a hook (including load and render) succeed at once.
    pub(crate) async fn call(
        &self,
        stage: LifecycleStage,
        props: &Value,
        timeout: Duration,
    ) -> Result<(), HookFailure> {
        let hook = match stage {
            LifecycleStage::Bootstrap => self.bootstrap.as_ref(),
            LifecycleStage::Mount => self.mount.as_ref(),
            LifecycleStage::Unmount => self.unmount.as_ref(),
            LifecycleStage::Load | LifecycleStage::Render => None,
        };
        let Some(hook) = hook else {
            debug!(%stage, "No hook exported, skipping");
            return Ok(());
        };

        match tokio::time::timeout(timeout, hook.call(vec![props.clone()])).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HookFailure::Raised(e.message)),
            Err(_) => Err(HookFailure::TimedOut(timeout)),
        }
    }
}

/// Build the props object passed to every hook of `descriptor`.
///
/// It carries `name`, `container` and `namespace`, plus functions reaching
/// the global state bus: `getGlobalState()`, `setGlobalState(partial)` and
/// `onGlobalStateChange(callback)`. Listeners registered through the latter
/// are owned by the application and dropped when it unmounts.
#[must_use]
pub fn mount_props(descriptor: &AppDescriptor, state: &Arc<GlobalState>) -> Value {
    let name = descriptor.name().to_string();

    let get_state = {
        let state = Arc::clone(state);
        HostFunction::sync("getGlobalState", move |_| {
            Ok(Value::from_json(serde_json::Value::Object(
                state.get_global_state(),
            )))
        })
    };

    let set_state = {
        let state = Arc::clone(state);
        HostFunction::sync("setGlobalState", move |args| {
            let partial = match args.first().map(Value::to_json) {
                Some(serde_json::Value::Object(partial)) => partial,
                _ => return Err(ScriptError::new("setGlobalState expects an object")),
            };
            let changed = state.set_global_state(partial);
            Ok(Value::List(changed.into_iter().map(Value::String).collect()))
        })
    };

    let on_change = {
        let state = Arc::clone(state);
        let owner = name.clone();
        HostFunction::sync("onGlobalStateChange", move |args| {
            let Some(callback) = args.first().and_then(Value::as_function).cloned() else {
                return Err(ScriptError::new("onGlobalStateChange expects a function"));
            };
            let owner_for_log = owner.clone();
            let registration = Arc::new(OnceLock::new());
            let listener = Arc::clone(&registration);
            let weak_state = Arc::downgrade(&state);
            let id = state.on_change(owner.clone(), move |current, previous| {
                let Ok(handle) = tokio::runtime::Handle::try_current() else {
                    warn!(owner = %owner_for_log, "No runtime to deliver state change");
                    return;
                };
                let callback = callback.clone();
                let args = vec![
                    Value::from_json(serde_json::Value::Object(current.clone())),
                    Value::from_json(serde_json::Value::Object(previous.clone())),
                ];
                let owner = owner_for_log.clone();
                let listener = Arc::clone(&listener);
                let weak_state = weak_state.clone();
                handle.spawn(async move {
                    // Delivery is queued; the owner may have unmounted since.
                    let registered = listener.get().copied().is_none_or(|id| {
                        weak_state
                            .upgrade()
                            .is_some_and(|state| state.is_listening(id))
                    });
                    if !registered {
                        debug!(owner = %owner, "Listener removed before delivery, dropping");
                        return;
                    }
                    if let Err(e) = callback.call(args).await {
                        warn!(owner = %owner, error = %e, "State change callback failed");
                    }
                });
            });
            let _ = registration.set(id);
            Ok(Value::Null)
        })
    };

    Value::object([
        ("name", Value::String(name)),
        ("container", Value::from(descriptor.container())),
        ("namespace", Value::String(descriptor.name().namespace())),
        ("getGlobalState", Value::Function(get_state)),
        ("setGlobalState", Value::Function(set_state)),
        ("onGlobalStateChange", Value::Function(on_change)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mosaic_test::{CallLog, Hook, RecordingApp, test_descriptor};
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_hooks_are_noops() {
        let lifecycles = Lifecycles::from_exports(None);
        assert!(lifecycles.is_empty());
        lifecycles
            .call(LifecycleStage::Mount, &Value::Null, Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_hooks_receive_props() {
        let log = CallLog::new();
        let app = RecordingApp::new("a", &log);
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&seen);
        app.probe(Hook::Mount, move |args| {
            *sink.lock().unwrap() = args.first().and_then(|p| p.get("namespace")).cloned();
        });

        let lifecycles = Lifecycles::from_exports(Some(&app.exports()));
        let props = mount_props(&test_descriptor("a", "/a"), &Arc::new(GlobalState::new()));
        lifecycles
            .call(LifecycleStage::Mount, &props, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(log.count("a", Hook::Mount), 1);
        assert_eq!(*seen.lock().unwrap(), Some(Value::from("mosaic-a")));
    }

    #[tokio::test]
    async fn test_hook_failure_and_timeout() {
        let log = CallLog::new();
        let app = RecordingApp::new("a", &log);
        let lifecycles = Lifecycles::from_exports(Some(&app.exports()));

        app.fail_next(Hook::Bootstrap);
        let err = lifecycles
            .call(LifecycleStage::Bootstrap, &Value::Null, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HookFailure::Raised(m) if m.contains("a:bootstrap")));

        app.delay(Hook::Unmount, Duration::from_millis(200));
        let err = lifecycles
            .call(LifecycleStage::Unmount, &Value::Null, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert_eq!(err, HookFailure::TimedOut(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_props_reach_global_state() {
        let state = Arc::new(GlobalState::new());
        let props = mount_props(&test_descriptor("a", "/a"), &state);

        let set = props.get("setGlobalState").and_then(Value::as_function).unwrap();
        let changed = set
            .call(vec![Value::from_json(json!({"user": "ann"}))])
            .await
            .unwrap();
        assert_eq!(changed, Value::List(vec![Value::from("user")]));
        assert!(set.call(vec![Value::from("nope")]).await.is_err());

        let get = props.get("getGlobalState").and_then(Value::as_function).unwrap();
        let snapshot = get.call(vec![]).await.unwrap();
        assert_eq!(snapshot.get("user"), Some(&Value::from("ann")));
    }

    #[tokio::test]
    async fn test_state_listener_owned_by_app() {
        let state = Arc::new(GlobalState::new());
        let props = mount_props(&test_descriptor("a", "/a"), &state);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let callback = HostFunction::sync("listener", move |args| {
            let _ = tx.send(args);
            Ok(Value::Null)
        });

        let on_change = props
            .get("onGlobalStateChange")
            .and_then(Value::as_function)
            .unwrap();
        on_change.call(vec![Value::Function(callback)]).await.unwrap();
        assert_eq!(state.listener_count(), 1);

        state.set_global_state(json!({"k": 1}).as_object().cloned().unwrap());
        let args = rx.recv().await.unwrap();
        assert_eq!(args[0].get("k"), Some(&Value::Number(1.0)));

        assert_eq!(state.remove_owner("a"), 1);
    }

    #[tokio::test]
    async fn test_state_change_dropped_after_owner_unmounts() {
        let state = Arc::new(GlobalState::new());
        let props = mount_props(&test_descriptor("a", "/a"), &state);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let callback = HostFunction::sync("listener", move |args| {
            let _ = tx.send(args);
            Ok(Value::Null)
        });
        let on_change = props
            .get("onGlobalStateChange")
            .and_then(Value::as_function)
            .unwrap();
        on_change.call(vec![Value::Function(callback)]).await.unwrap();

        // The current-thread runtime cannot run the delivery task before the
        // owner is removed.
        state.set_global_state(json!({"k": 1}).as_object().cloned().unwrap());
        assert_eq!(state.remove_owner("a"), 1);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(rx.try_recv().is_err());
    }
}
