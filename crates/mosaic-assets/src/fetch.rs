//! Network access for entry documents and assets.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{AssetError, AssetResult};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default response size limit (5 MiB).
const DEFAULT_MAX_BYTES: usize = 5_242_880;

/// Fetches text resources by absolute URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` and return its body as text.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Fetch`] on transport failure and
    /// [`AssetError::Status`] on a non-success response.
    async fn fetch_text(&self, url: &Url) -> AssetResult<String>;
}

/// Settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Largest accepted response body.
    pub max_bytes: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: concat!("mosaic/", env!("CARGO_PKG_VERSION")).to_string(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// [`Fetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Build a fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Client`] if the TLS backend fails to initialize.
    pub fn new(settings: &FetchSettings) -> AssetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| AssetError::Client(e.to_string()))?;
        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &Url) -> AssetResult<String> {
        debug!(url = %url, "Fetching");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AssetError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| len > u64::try_from(self.max_bytes).unwrap_or(u64::MAX))
        {
            return Err(AssetError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }

        let bytes = response.bytes().await.map_err(|e| AssetError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if bytes.len() > self.max_bytes {
            return Err(AssetError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }

        debug!(url = %url, bytes = bytes.len(), "Fetched");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&FetchSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app/index.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/app/index.html", server.uri())).unwrap();
        assert_eq!(fetcher().fetch_text(&url).await.unwrap(), "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "mosaic-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let settings = FetchSettings {
            user_agent: "mosaic-test".into(),
            ..FetchSettings::default()
        };
        let url = Url::parse(&server.uri()).unwrap();
        let body = HttpFetcher::new(&settings)
            .unwrap()
            .fetch_text(&url)
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher().fetch_text(&url).await.unwrap_err();
        assert!(matches!(err, AssetError::Status { status: 404, .. }));
        assert!(err.is_fetch());
    }

    #[tokio::test]
    async fn test_size_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let settings = FetchSettings {
            max_bytes: 16,
            ..FetchSettings::default()
        };
        let url = Url::parse(&server.uri()).unwrap();
        let err = HttpFetcher::new(&settings)
            .unwrap()
            .fetch_text(&url)
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::TooLarge { limit: 16, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        let err = fetcher().fetch_text(&url).await.unwrap_err();
        assert!(matches!(err, AssetError::Fetch { .. }));
    }
}
