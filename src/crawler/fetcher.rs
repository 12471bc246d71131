//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a bounded transport timeout
//! - Content-Type checks (only HTML is indexed)
//! - Error classification into a single `FetchError`

use crate::config::UserAgentConfig;
use crate::crawler::parser::{parse_html, ParsedPage};
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed for one fetch
const MAX_REDIRECTS: usize = 10;

/// Reasons a page could not be fetched
///
/// Callers treat every variant the same way: the page contributes no
/// content and no outgoing links.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timed out for {url}")]
    Timeout { url: String },

    #[error("Not an HTML page ({content_type}) at {url}")]
    NotHtml { url: String, content_type: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

/// A successfully fetched and parsed page
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL exactly as requested
    pub url: String,

    /// Lowercased host of the requested URL
    pub domain: String,

    /// Parsed content
    pub content: ParsedPage,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Transport timeout for a whole request
///
/// # Example
///
/// ```no_run
/// use ripple_search::config::UserAgentConfig;
/// use ripple_search::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "RippleSearch".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages and parses them into body text and anchors
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_links_per_page: usize,
}

impl Fetcher {
    /// Creates a fetcher around an existing client
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to use
    /// * `max_links_per_page` - Per-page anchor cap
    pub fn new(client: Client, max_links_per_page: usize) -> Self {
        Self {
            client,
            max_links_per_page,
        }
    }

    /// Fetches a URL and parses it
    ///
    /// # Request Flow
    ///
    /// 1. Parse the URL (must be http/https)
    /// 2. Send GET request (redirects followed up to 10 hops)
    /// 3. Reject non-2xx statuses
    /// 4. Reject responses whose Content-Type is present but not HTML
    /// 5. Read the body and parse it
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - Page body text and anchors
    /// * `Err(FetchError)` - The page yields no content
    pub async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let parsed_url = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !matches!(parsed_url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                message: format!("unsupported scheme {}", parsed_url.scheme()),
            });
        }

        let domain = parsed_url
            .host_str()
            .map(str::to_lowercase)
            .ok_or_else(|| FetchError::InvalidUrl {
                url: url.to_string(),
                message: "missing host".to_string(),
            })?;

        let response = self
            .client
            .get(parsed_url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_lowercase);

        if let Some(content_type) = content_type {
            if !is_html(&content_type) {
                return Err(FetchError::NotHtml {
                    url: url.to_string(),
                    content_type,
                });
            }
        }

        // Relative links resolve against the final URL after redirects
        let base_url = response.url().clone();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        tracing::debug!("Fetched {} ({} bytes)", url, body.len());

        Ok(Page {
            url: url.to_string(),
            domain,
            content: parse_html(&body, &base_url, self.max_links_per_page),
        })
    }
}

/// Returns true for HTML and XHTML media types
fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

/// Maps a transport error to a fetch error
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn test_fetcher() -> Fetcher {
        let client = build_http_client(&create_test_config(), Duration::from_secs(5)).unwrap();
        Fetcher::new(client, 100)
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        let client = build_http_client(&config, Duration::from_secs(10));
        assert!(client.is_ok());
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("application/xhtml+xml"));
        assert!(!is_html("application/json"));
        assert!(!is_html("image/png"));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = test_fetcher().fetch("not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let result = test_fetcher().fetch("ftp://example.com/file").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Port 9 (discard) is closed on test machines
        let result = test_fetcher().fetch("http://127.0.0.1:9/").await;
        match result {
            // The transport error is reported as is
            Err(FetchError::Network { message, .. }) => {
                assert!(message.contains("127.0.0.1:9"), "{}", message);
            }
            Err(FetchError::Timeout { .. }) => {}
            other => panic!("unexpected result: {:?}", other.map(|p| p.url)),
        }
    }
}
