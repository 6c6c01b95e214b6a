//! Application registry.

use std::sync::Arc;

use mosaic_core::AppDescriptor;
use tracing::info;

use crate::error::{RuntimeError, RuntimeResult};

/// Append-only, ordered collection of registered applications.
///
/// Registration order is significant: when activation rules overlap, the
/// application registered first wins.
#[derive(Debug, Default)]
pub struct AppRegistry {
    apps: Vec<Arc<AppDescriptor>>,
}

impl AppRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::DuplicateName`] if the name is taken.
    pub fn register(&mut self, descriptor: AppDescriptor) -> RuntimeResult<Arc<AppDescriptor>> {
        if self.get(descriptor.name().as_str()).is_some() {
            return Err(RuntimeError::DuplicateName {
                name: descriptor.name().clone(),
            });
        }
        info!(
            app = %descriptor.name(),
            entry = %descriptor.entry(),
            rule = %descriptor.active_rule(),
            "Registered application"
        );
        let descriptor = Arc::new(descriptor);
        self.apps.push(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// First application, in registration order, whose rule matches `path`.
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<&Arc<AppDescriptor>> {
        self.apps.iter().find(|app| app.matches(path))
    }

    /// Look up an application by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<AppDescriptor>> {
        self.apps.iter().find(|app| app.name() == name)
    }

    /// Registered applications in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<AppDescriptor>> {
        self.apps.iter()
    }

    /// Number of registered applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}
