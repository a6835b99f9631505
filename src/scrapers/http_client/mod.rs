//! HTTP client for repertoire pages.
//!
//! Sends a browser-like header set and decodes gzip, deflate and brotli
//! bodies. Anything else the server compresses with is reported as
//! `FetchError::UnsupportedEncoding` instead of being handed to the parser.

mod user_agent;

pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_ENCODING};
use reqwest::Client;
use tracing::debug;

use crate::error::FetchError;

/// Encodings reqwest decodes for us with the enabled features.
const SUPPORTED_ENCODINGS: &[&str] = &["gzip", "x-gzip", "deflate", "br", "identity"];

/// HTTP client with browser-like defaults.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Client with the configured user agent, or the built-in browser one.
    pub fn new(timeout: Duration, user_agent_config: Option<&str>) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("pl-PL,pl;q=0.9,en;q=0.8"),
        );

        let client = Client::builder()
            .user_agent(&user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .cookie_store(true)
            .build()?;

        Ok(Self { client, timeout })
    }

    /// Fetch a page and return its decoded text.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        debug!(
            "GET {} -> {} in {}ms",
            url,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // reqwest strips Content-Encoding for bodies it decodes; anything
        // left over is an encoding we cannot read.
        if let Some(encoding) = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
        {
            let encoding = encoding.trim().to_ascii_lowercase();
            if !SUPPORTED_ENCODINGS.contains(&encoding.as_str()) {
                return Err(FetchError::UnsupportedEncoding {
                    url: url.to_string(),
                    encoding,
                });
            }
        }

        response.text().await.map_err(|e| self.classify(url, e))
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else if error.is_decode() || error.is_body() {
            FetchError::Decode {
                url: url.to_string(),
                reason: error.to_string(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: error,
            }
        }
    }
}
