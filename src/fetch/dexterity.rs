//! Dexterity fills API client.
//!
//! `GET {base}/fills?product=<SYMBOL>[&before=<unix_ts>]` returns
//! `{"fills": [...]}` newest first. No authentication is required.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::FillSource;
use crate::models::Fill;

pub const DEXTERITY_API_BASE: &str = "https://dexterity.hxro.com";

#[derive(Debug, Deserialize)]
struct FillsResponse {
    fills: Vec<Fill>,
}

/// Outcome of a single failed attempt.
enum AttemptError {
    /// Connection failures, timeouts and 5xx responses.
    Transient(anyhow::Error),
    Fatal(anyhow::Error),
}

/// HTTP fill source backed by the Dexterity fills endpoint.
///
/// Fails on the first error unless retries are configured; only transport
/// errors and 5xx responses are ever retried.
#[derive(Debug, Clone)]
pub struct DexterityFillSource {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl DexterityFillSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Creates a source with a custom reqwest client (timeouts, proxies).
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: DEXTERITY_API_BASE.to_string(),
            max_retries: 0,
            retry_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn fills_url(&self, product: &str, before: Option<i64>) -> String {
        let mut url = format!("{}/fills?product={}", self.base_url, product);
        if let Some(before) = before {
            url.push_str(&format!("&before={before}"));
        }
        url
    }

    async fn attempt(&self, url: &str) -> std::result::Result<Vec<Fill>, AttemptError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("User-Agent", concat!("fillbook/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| AttemptError::Transient(anyhow!(e).context("HTTP request failed")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AttemptError::Transient(anyhow!(e).context("Failed to read response body"))
        })?;

        if !status.is_success() {
            let err = anyhow!("Fills API error: {} - {}", status, body);
            return Err(if status.is_server_error() {
                AttemptError::Transient(err)
            } else {
                AttemptError::Fatal(err)
            });
        }

        let data: FillsResponse = serde_json::from_str(&body)
            .context("Failed to parse fills response")
            .map_err(AttemptError::Fatal)?;
        Ok(data.fills)
    }
}

impl Default for DexterityFillSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FillSource for DexterityFillSource {
    async fn fetch_page(&self, product: &str, before: Option<i64>) -> Result<Vec<Fill>> {
        let url = self.fills_url(product, before);
        let mut retries = 0;

        loop {
            debug!(%url, attempt = retries + 1, "requesting fills page");
            match self.attempt(&url).await {
                Ok(fills) => {
                    debug!(product, count = fills.len(), "received fills page");
                    return Ok(fills);
                }
                Err(AttemptError::Transient(err)) if retries < self.max_retries => {
                    retries += 1;
                    warn!(
                        product,
                        retry = retries,
                        max_retries = self.max_retries,
                        error = %err,
                        "Transient fills API failure; retrying"
                    );
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(AttemptError::Transient(err)) | Err(AttemptError::Fatal(err)) => {
                    return Err(err.context(format!("Failed to fetch fills from {url}")));
                }
            }
        }
    }

    fn name(&self) -> &str {
        "dexterity"
    }
}
