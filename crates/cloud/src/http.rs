//! HTTP client wrapper with retry logic.

use crate::error::Result;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::warn;

/// Initial backoff; doubled after each failed attempt.
const BASE_BACKOFF: Duration = Duration::from_millis(250);

/// HTTP client for provider requests.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(request_timeout: Duration, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("sheed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, max_retries })
    }

    /// GET `url` with the given query pairs.
    ///
    /// Timeouts and connection failures are retried; any response, whatever
    /// its status, is returned to the caller. Errors never carry the URL,
    /// since query strings hold credentials.
    pub async fn get<Q>(&self, url: &str, query: &Q) -> Result<Response>
    where
        Q: serde::Serialize + ?Sized,
    {
        let request = self.client.get(url).query(query);
        Ok(self.execute_with_retry(request).await?)
    }

    /// Execute a request with exponential backoff retry.
    async fn execute_with_retry(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<Response, reqwest::Error> {
        let mut attempt = 0;
        loop {
            let Some(cloned) = request.try_clone() else {
                return request.send().await.map_err(reqwest::Error::without_url);
            };

            match cloned.send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries => {
                    let e = e.without_url();
                    let backoff = BASE_BACKOFF * 2u32.pow(attempt);
                    warn!(attempt = attempt + 1, ?backoff, "transient HTTP failure: {e}");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.without_url()),
            }
        }
    }
}
