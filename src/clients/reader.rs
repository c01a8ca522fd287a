use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Remote service that turns a listing page into plain text/markdown.
#[async_trait]
pub trait ContentReader: Send + Sync {
    async fn fetch(&self, listing_url: &str) -> Result<String>;
}

/// Timeout and retry policy for reader calls.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    /// Base delay, doubled on each subsequent retry.
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff: Duration::from_secs(2),
        }
    }
}

/// HTTP client for a Jina-style reader endpoint: the page text of
/// `<listing-url>` is served at `<endpoint>/<listing-url>`.
pub struct ReaderClient {
    client: Client,
    endpoint: String,
    policy: FetchPolicy,
}

impl ReaderClient {
    pub fn new(endpoint: impl Into<String>, policy: FetchPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            policy,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach reader service")?;

        if !response.status().is_success() {
            anyhow::bail!("Reader returned status {}", response.status());
        }

        response.text().await.context("Failed to read response body")
    }
}

#[async_trait]
impl ContentReader for ReaderClient {
    async fn fetch(&self, listing_url: &str) -> Result<String> {
        let url = format!("{}/{}", self.endpoint, listing_url);

        let mut delay = self.policy.backoff;
        let mut last_err = None;
        for attempt in 0..=self.policy.max_retries {
            match self.fetch_once(&url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if attempt < self.policy.max_retries {
                        warn!(
                            "Fetch attempt {} for {} failed ({}), retrying in {}s",
                            attempt + 1,
                            listing_url,
                            e,
                            delay.as_secs()
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Fetch failed for {listing_url}")))
    }
}
