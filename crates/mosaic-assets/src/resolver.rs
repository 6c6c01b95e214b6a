//! Entry loading with a shared asset cache.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use url::Url;

use crate::error::AssetResult;
use crate::fetch::Fetcher;
use crate::parse::{AssetOrigin, AssetRef, EntryAssets, parse_entry};

/// Loads entry documents and the bodies of the assets they reference.
///
/// External asset bodies are cached by absolute URL and shared by every
/// application using the same resolver. Entry documents are not cached;
/// callers load an entry once per application instance.
///
/// The cache is unbounded and lives as long as the resolver. Nothing in the
/// orchestrator evicts entries; long-lived hosts that load many distinct
/// assets should call [`AssetResolver::clear_cache`] themselves.
pub struct AssetResolver {
    fetcher: Arc<dyn Fetcher>,
    cache: DashMap<Url, Arc<str>>,
}

impl std::fmt::Debug for AssetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetResolver")
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl AssetResolver {
    /// Create a resolver over `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            cache: DashMap::new(),
        }
    }

    /// Fetch and parse the entry document at `entry`.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if the entry document cannot be retrieved.
    /// Malformed markup is not an error; see [`EntryAssets::diagnostics`].
    pub async fn load(&self, entry: &Url) -> AssetResult<EntryAssets> {
        let html = self.fetcher.fetch_text(entry).await?;
        let assets = parse_entry(entry, &html)?;
        info!(
            entry = %entry,
            scripts = assets.scripts.len(),
            styles = assets.styles.len(),
            "Entry resolved"
        );
        Ok(assets)
    }

    /// Text of an asset: inline content directly, external content from the
    /// cache or the network.
    ///
    /// # Errors
    ///
    /// Returns the fetch error for an uncached external asset that cannot
    /// be retrieved. Failures are not cached.
    pub async fn source(&self, asset: &AssetRef) -> AssetResult<Arc<str>> {
        let url = match &asset.origin {
            AssetOrigin::Inline { content, .. } => return Ok(Arc::from(content.as_str())),
            AssetOrigin::External(url) => url,
        };

        if let Some(cached) = self.cache.get(url) {
            debug!(url = %url, "Asset cache hit");
            return Ok(Arc::clone(cached.value()));
        }

        let body: Arc<str> = Arc::from(self.fetcher.fetch_text(url).await?);
        self.cache.insert(url.clone(), Arc::clone(&body));
        Ok(body)
    }

    /// Number of cached asset bodies.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Whether `url` is cached.
    #[must_use]
    pub fn is_cached(&self, url: &Url) -> bool {
        self.cache.contains_key(url)
    }

    /// Drop every cached body.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchSettings, HttpFetcher};
    use crate::parse::AssetKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with_app(script_requests: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><link rel="stylesheet" href="a.css"></head>
                <body><div id="a-root">A</div><script src="a.js"></script></body></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a/a.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("window.a = 1;"))
            .expect(script_requests)
            .mount(&server)
            .await;
        server
    }

    fn resolver() -> AssetResolver {
        AssetResolver::new(Arc::new(
            HttpFetcher::new(&FetchSettings::default()).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_load_entry() {
        let server = server_with_app(0).await;
        let entry = Url::parse(&format!("{}/a/", server.uri())).unwrap();

        let assets = resolver().load(&entry).await.unwrap();
        assert_eq!(assets.scripts.len(), 1);
        assert_eq!(assets.styles.len(), 1);
        assert_eq!(
            assets.scripts[0].url().unwrap().as_str(),
            format!("{}/a/a.js", server.uri())
        );
        assert_eq!(assets.html_body, r#"<div id="a-root">A</div>"#);
    }

    #[tokio::test]
    async fn test_external_source_is_cached() {
        let server = server_with_app(1).await;
        let resolver = resolver();
        let url = Url::parse(&format!("{}/a/a.js", server.uri())).unwrap();
        let asset = AssetRef {
            kind: AssetKind::Script,
            origin: AssetOrigin::External(url.clone()),
        };

        assert_eq!(&*resolver.source(&asset).await.unwrap(), "window.a = 1;");
        assert_eq!(&*resolver.source(&asset).await.unwrap(), "window.a = 1;");
        assert!(resolver.is_cached(&url));
        assert_eq!(resolver.cached(), 1);
        // The mock server verifies a single script request on drop.
    }

    #[tokio::test]
    async fn test_inline_source_bypasses_cache() {
        let resolver = resolver();
        let asset = AssetRef {
            kind: AssetKind::Style,
            origin: AssetOrigin::Inline {
                index: 0,
                content: "p { margin: 0 }".into(),
            },
        };
        assert_eq!(&*resolver.source(&asset).await.unwrap(), "p { margin: 0 }");
        assert_eq!(resolver.cached(), 0);
    }

    #[tokio::test]
    async fn test_entry_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let entry = Url::parse(&format!("{}/broken/", server.uri())).unwrap();
        let err = resolver().load(&entry).await.unwrap_err();
        assert!(err.is_fetch());
    }
}
