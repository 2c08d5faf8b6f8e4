// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use url::Url;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Check that the host of `url` resolves before starting a run.
pub async fn ensure_resolvable(url: &Url) -> Result<()> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::config(format!("URL has no host: {}", url)))?;
    let port = url.port_or_known_default().unwrap_or(80);

    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| AppError::unresolvable(host, e.to_string()))?;
    if addrs.next().is_none() {
        return Err(AppError::unresolvable(host, "no addresses"));
    }
    Ok(())
}
