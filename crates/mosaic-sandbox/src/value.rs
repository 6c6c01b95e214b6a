//! Values stored in host globals and sandbox stores.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::script::ScriptError;

type HostFn = dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, ScriptError>> + Send + Sync;

/// A callable value.
///
/// Functions are asynchronous so lifecycle hooks exported by an application
/// can suspend. Two handles are equal only if they point at the same closure.
#[derive(Clone)]
pub struct HostFunction {
    name: Arc<str>,
    func: Arc<HostFn>,
}

impl HostFunction {
    /// Wrap an async closure.
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ScriptError>> + Send + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(move |args| Box::pin(func(args))),
        }
    }

    /// Wrap a synchronous closure.
    pub fn sync<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, ScriptError> + Send + Sync + 'static,
    {
        let func = Arc::new(func);
        Self::new(name, move |args| {
            let func = Arc::clone(&func);
            async move { func(args) }
        })
    }

    /// Function name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the function.
    ///
    /// # Errors
    ///
    /// Returns whatever [`ScriptError`] the function raises.
    pub async fn call(&self, args: Vec<Value>) -> Result<Value, ScriptError> {
        (self.func)(args).await
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[function {}]", self.name)
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

/// A global property value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absent or explicitly null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// String.
    String(String),
    /// Ordered list.
    List(Vec<Value>),
    /// Keyed object.
    Object(BTreeMap<String, Value>),
    /// Callable.
    Function(HostFunction),
}

impl Value {
    /// Build an object from key/value pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Objects and lists are compound; reads of compound values hand out
    /// wrappers so nested writes stay in the owning store.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(self, Self::List(_) | Self::Object(_))
    }

    /// Whether this value is, or directly contains, a function.
    #[must_use]
    pub fn is_callable_export(&self) -> bool {
        match self {
            Self::Function(_) => true,
            Self::Object(fields) => fields.values().any(|v| matches!(v, Self::Function(_))),
            _ => false,
        }
    }

    /// String contents, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Function handle, if this is a function.
    #[must_use]
    pub fn as_function(&self) -> Option<&HostFunction> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Look up a field of an object or an index of a list.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(fields) => fields.get(key),
            Self::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Follow a path of field names.
    #[must_use]
    pub fn get_path(&self, path: &[String]) -> Option<&Value> {
        path.iter().try_fold(self, |current, key| current.get(key))
    }

    /// Write `value` at `path` below `self`, which must be compound at every
    /// step. Returns `false` if an intermediate step is missing or scalar.
    pub fn set_path(&mut self, path: &[String], value: Value) -> bool {
        let Some((last, parents)) = path.split_last() else {
            *self = value;
            return true;
        };
        let mut current = self;
        for key in parents {
            let next = match current {
                Self::Object(fields) => fields.get_mut(key),
                Self::List(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
                _ => None,
            };
            match next {
                Some(child) => current = child,
                None => return false,
            }
        }
        match current {
            Self::Object(fields) => {
                fields.insert(last.clone(), value);
                true
            },
            Self::List(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(slot) => {
                    *slot = value;
                    true
                },
                None => false,
            },
            _ => false,
        }
    }

    /// Convert from JSON.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            },
            serde_json::Value::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to JSON. Functions and non-finite numbers become `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null | Self::Function(_) => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<HostFunction> for Value {
    fn from(f: HostFunction) -> Self {
        Self::Function(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_json_conversion() {
        let json = json!({"a": [1, "two", true, null], "b": {"c": 3}});
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_functions_serialize_as_null() {
        let f = HostFunction::sync("noop", |_| Ok(Value::Null));
        let value = Value::object([("f", Value::Function(f))]);
        assert_eq!(value.to_json(), json!({"f": null}));
    }

    #[test]
    fn test_get_and_set_path() {
        let mut value = Value::from_json(json!({"a": {"b": [10, 20]}}));
        assert_eq!(
            value.get_path(&path(&["a", "b", "1"])),
            Some(&Value::Number(20.0))
        );

        assert!(value.set_path(&path(&["a", "b", "0"]), Value::from("x")));
        assert!(value.set_path(&path(&["a", "new"]), Value::Bool(true)));
        assert!(!value.set_path(&path(&["missing", "x"]), Value::Null));
        assert!(!value.set_path(&path(&["a", "b", "9"]), Value::Null));

        assert_eq!(
            value.to_json(),
            json!({"a": {"b": ["x", 20], "new": true}})
        );
    }

    #[test]
    fn test_callable_export_detection() {
        let f = HostFunction::sync("mount", |_| Ok(Value::Null));
        assert!(Value::Function(f.clone()).is_callable_export());
        assert!(Value::object([("mount", Value::Function(f))]).is_callable_export());
        assert!(!Value::from("text").is_callable_export());
        assert!(!Value::object([("n", Value::Number(1.0))]).is_callable_export());
    }

    #[test]
    fn test_function_identity_equality() {
        let f = HostFunction::sync("f", |_| Ok(Value::Null));
        let g = HostFunction::sync("f", |_| Ok(Value::Null));
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }

    #[tokio::test]
    async fn test_function_call() {
        let double = HostFunction::sync("double", |args| match args.first() {
            Some(Value::Number(n)) => Ok(Value::Number(n * 2.0)),
            _ => Err(ScriptError::new("expected a number")),
        });
        assert_eq!(
            double.call(vec![Value::Number(4.0)]).await.unwrap(),
            Value::Number(8.0)
        );
        assert!(double.call(vec![]).await.is_err());
    }
}
