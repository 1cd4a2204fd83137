//! Per-prospect transcript page fetching.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

/// Upper bound on any single fetch. A hung source must not stall the rest
/// of the batch; a timed-out fetch is reported like any other failure.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Retrieve one transcript page body. Concurrency is the caller's
    /// concern; implementations handle a single URL.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpTranscriptFetcher {
    client: reqwest::Client,
}

impl HttpTranscriptFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl Default for HttpTranscriptFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptFetcher for HttpTranscriptFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Transcript request failed")?
            .error_for_status()
            .context("Transcript returned an error status")?;

        let body = response
            .text()
            .await
            .context("Transcript body read failed")?;

        info!(url, bytes = body.len(), "Transcript fetched");
        Ok(body)
    }
}
