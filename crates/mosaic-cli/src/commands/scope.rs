//! `mosaic scope`: rewrite a stylesheet under an application namespace.

use std::path::Path;

use anyhow::{Context, Result};
use mosaic_assets::scope_css;
use mosaic_core::AppName;

/// Print `file` scoped under `namespace`.
///
/// A bare application name is turned into its `mosaic-{name}` namespace.
pub(crate) fn run_scope(file: &Path, namespace: &str) -> Result<()> {
    let css = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    print!("{}", scope_css(&css, &resolve_namespace(namespace)));
    Ok(())
}

fn resolve_namespace(raw: &str) -> String {
    match raw.strip_prefix('.') {
        Some(class) => class.to_string(),
        None => AppName::new(raw).map_or_else(|_| raw.to_string(), |name| name.namespace()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_namespace() {
        assert_eq!(resolve_namespace("orders"), "mosaic-orders");
        assert_eq!(resolve_namespace(".custom"), "custom");
    }
}
