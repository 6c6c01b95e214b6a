//! Test fixtures and helpers.

use mosaic_core::AppDescriptor;

/// Mount target used by [`test_descriptor`].
pub const TEST_CONTAINER: &str = "#subapp";

/// Entry location of the test application `name`.
#[must_use]
pub fn entry_url(name: &str) -> String {
    format!("http://apps.test/{name}/")
}

/// A descriptor for `name`, served from [`entry_url`] and mounted into
/// [`TEST_CONTAINER`].
///
/// # Panics
///
/// Panics if `name` or `rule` is invalid.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_descriptor(name: &str, rule: &str) -> AppDescriptor {
    AppDescriptor::new(name, &entry_url(name), TEST_CONTAINER, rule)
        .expect("valid test descriptor")
}

/// Builder for entry documents.
#[derive(Debug, Clone, Default)]
pub struct EntryPage {
    head: Vec<String>,
    body: Vec<String>,
}

impl EntryPage {
    /// An empty page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append body markup.
    #[must_use]
    pub fn markup(mut self, html: &str) -> Self {
        self.body.push(html.to_string());
        self
    }

    /// Append an inline script to the body.
    #[must_use]
    pub fn inline_script(mut self, source: &str) -> Self {
        self.body.push(format!("<script>{source}</script>"));
        self
    }

    /// Append an external script to the body.
    #[must_use]
    pub fn external_script(mut self, src: &str) -> Self {
        self.body.push(format!(r#"<script src="{src}"></script>"#));
        self
    }

    /// Append an inline style block to the head.
    #[must_use]
    pub fn style(mut self, css: &str) -> Self {
        self.head.push(format!("<style>{css}</style>"));
        self
    }

    /// Append a stylesheet link to the head.
    #[must_use]
    pub fn stylesheet(mut self, href: &str) -> Self {
        self.head
            .push(format!(r#"<link rel="stylesheet" href="{href}">"#));
        self
    }

    /// Render the document.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html><head>{}</head><body>{}</body></html>",
            self.head.concat(),
            self.body.concat()
        )
    }
}

/// Install a test-friendly `tracing` subscriber once per process.
///
/// Honours `RUST_LOG`; output goes through the test harness capture.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
