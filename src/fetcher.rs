//! Remote page retrieval.
//!
//! The [`Fetcher`] trait is the only way the rest of the crate touches the
//! network, so downloads and synchronization can run against a fake source.

use crate::error::ScraperError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Request timeout for every fetch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Body and declared content type of a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Raw response body.
    pub body: Vec<u8>,

    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
}

impl FetchedPage {
    /// Creates a page with no declared content type.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    /// Sets the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Capability to GET a URL.
///
/// Implementations must fail with a network-class [`ScraperError`] on
/// connection failure, timeout or a non-2xx status.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError>;
}

/// [`Fetcher`] backed by a `reqwest` client with certificate validation.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds the shared HTTP client.
    pub fn new() -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(ScraperError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(FetchedPage { body, content_type })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeFetcher;
    use super::*;

    #[test]
    fn test_fetched_page_builder() {
        let page = FetchedPage::new(vec![1u8, 2, 3]).with_content_type("image/png");
        assert_eq!(page.body, vec![1, 2, 3]);
        assert_eq!(page.content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new().is_ok());
    }

    #[tokio::test]
    async fn test_fake_fetcher_not_found() {
        let fake = FakeFetcher::new();
        fake.serve_html("https://a/1", "<html></html>");
        fake.fail("https://a/2", 500);

        assert!(fake.fetch("https://a/1").await.is_ok());
        let err = fake.fetch("https://a/2").await.unwrap_err();
        assert!(err.is_network() && !err.is_not_found());
        assert!(fake.fetch("https://a/3").await.unwrap_err().is_not_found());
        assert_eq!(fake.requests().len(), 3);
    }
}
