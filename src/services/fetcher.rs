//! Listing page fetcher with bounded retries.
//!
//! A non-2xx status is final. Connection errors and timeouts are retried
//! after `backoff_base * 2^attempt`, up to `max_retries` retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{CrawlerConfig, FetchOutcome};
use crate::utils::http::create_async_client;

/// Status and body of one GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single GET request; errors are treated as transient by the fetcher.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page>;
}

/// Transport over a shared reqwest connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Page> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Ok(Page {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        let body = response.text().await?;
        Ok(Page {
            status: status.as_u16(),
            body,
        })
    }
}

/// Timeout and backoff settings of the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Bound on each attempt, body included
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base(),
        }
    }

    /// Wait before retrying after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Fetches one URL, retrying transient failures.
#[derive(Clone)]
pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One attempt: `Success`, `NotFound` or `TransientFailure`.
    pub async fn attempt(&self, url: &str) -> FetchOutcome {
        match tokio::time::timeout(self.policy.timeout, self.transport.get(url)).await {
            Ok(Ok(page)) if page.is_success() => FetchOutcome::Success(page.body),
            Ok(Ok(page)) => FetchOutcome::NotFound {
                status: page.status,
            },
            Ok(Err(e)) => FetchOutcome::TransientFailure(e.to_string()),
            Err(_) => FetchOutcome::TransientFailure(format!(
                "timed out after {}s",
                self.policy.timeout.as_secs_f32()
            )),
        }
    }

    /// Fetch `url`: `Success`, `NotFound` or `ExhaustedRetries`.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                FetchOutcome::TransientFailure(cause) => {
                    if attempt >= self.policy.max_retries {
                        log::warn!(
                            "Giving up on {} after {} attempts: {}",
                            url,
                            attempt + 1,
                            cause
                        );
                        return FetchOutcome::ExhaustedRetries {
                            attempts: attempt + 1,
                        };
                    }
                    let wait = self.policy.backoff(attempt);
                    log::debug!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        url,
                        cause,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
