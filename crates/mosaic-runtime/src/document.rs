//! The host document tree, as seen by the orchestrator.

use std::sync::{PoisonError, RwLock};

use dashmap::DashMap;
use mosaic_core::AppName;
use thiserror::Error;
use tracing::debug;

/// Errors raised by a [`DocumentHost`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// No node matches the mount target selector.
    #[error("mount target '{0}' not found")]
    MissingContainer(String),
}

/// The parts of the host document the orchestrator writes to.
///
/// Only the active application's mount target is ever written; it is
/// cleared during that application's own unmount.
pub trait DocumentHost: Send + Sync {
    /// Whether `selector` resolves to a node.
    fn has_container(&self, selector: &str) -> bool;

    /// Replace the content of the mount target.
    ///
    /// # Errors
    ///
    /// [`DocumentError::MissingContainer`] if the target does not exist.
    fn render(&self, selector: &str, markup: &str) -> Result<(), DocumentError>;

    /// Empty the mount target.
    fn clear(&self, selector: &str);

    /// Insert a style node tagged with its owner.
    fn insert_style(&self, owner: &AppName, css: &str);

    /// Remove every style node owned by `owner`. Returns how many were removed.
    fn remove_styles(&self, owner: &AppName) -> usize;
}

/// A style node inserted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleNode {
    /// Owning application.
    pub owner: String,
    /// Scoped stylesheet text.
    pub css: String,
}

/// In-memory [`DocumentHost`].
///
/// Built with [`new`](Self::new), any selector is accepted as a mount
/// target. Built with [`with_containers`](Self::with_containers), only the
/// listed selectors exist.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    containers: DashMap<String, String>,
    strict: bool,
    styles: RwLock<Vec<StyleNode>>,
}

impl MemoryDocument {
    /// A document accepting any mount target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A document with exactly these mount targets.
    pub fn with_containers<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let containers = selectors
            .into_iter()
            .map(|s| (s.into(), String::new()))
            .collect();
        Self {
            containers,
            strict: true,
            styles: RwLock::new(Vec::new()),
        }
    }

    /// Current content of a mount target.
    #[must_use]
    pub fn content(&self, selector: &str) -> Option<String> {
        self.containers.get(selector).map(|c| c.value().clone())
    }

    /// Every style node, in insertion order.
    #[must_use]
    pub fn styles(&self) -> Vec<StyleNode> {
        self.styles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Style nodes owned by `owner`.
    #[must_use]
    pub fn styles_for(&self, owner: &str) -> Vec<StyleNode> {
        self.styles()
            .into_iter()
            .filter(|node| node.owner == owner)
            .collect()
    }
}

impl DocumentHost for MemoryDocument {
    fn has_container(&self, selector: &str) -> bool {
        !self.strict || self.containers.contains_key(selector)
    }

    fn render(&self, selector: &str, markup: &str) -> Result<(), DocumentError> {
        if !self.has_container(selector) {
            return Err(DocumentError::MissingContainer(selector.to_string()));
        }
        debug!(container = selector, bytes = markup.len(), "Rendered mount target");
        self.containers
            .insert(selector.to_string(), markup.to_string());
        Ok(())
    }

    fn clear(&self, selector: &str) {
        if let Some(mut content) = self.containers.get_mut(selector) {
            content.clear();
        }
    }

    fn insert_style(&self, owner: &AppName, css: &str) {
        self.styles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StyleNode {
                owner: owner.to_string(),
                css: css.to_string(),
            });
    }

    fn remove_styles(&self, owner: &AppName) -> usize {
        let mut styles = self.styles.write().unwrap_or_else(PoisonError::into_inner);
        let before = styles.len();
        styles.retain(|node| node.owner != owner.as_str());
        before.saturating_sub(styles.len())
    }
}

/// Markup written into the mount target for `app`: its body wrapped in a root
/// carrying the application's namespace class.
#[must_use]
pub fn wrap_markup(app: &AppName, body: &str) -> String {
    format!(
        r#"<div class="{}" data-mosaic-app="{app}">{body}</div>"#,
        app.namespace()
    )
}
