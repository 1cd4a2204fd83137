//! Daily prospect feed: one CSV listing of prospects per date range, each
//! row carrying the URL of that prospect's transcript page.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use handoff_common::{DateSpec, ProspectRow};

use crate::util::atomic_write;

const FEED_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait ProspectFeed: Send + Sync {
    /// Fetch and decode the prospect listing for a date range.
    async fn daily_prospects(&self, date: &DateSpec) -> Result<Vec<ProspectRow>>;
}

/// Append the date-range query to the API base URL. The base already
/// carries its fixed query string, so parameters join with `&`.
pub fn build_url(base: &str, date: &DateSpec, today: NaiveDate) -> String {
    let (start, end) = date.range(today);
    format!("{base}&startDate={start}&endDate={end}")
}

/// Decode the feed CSV into prospect rows. The header row must carry a
/// `transcript` column; rows with an empty transcript URL are skipped with
/// a warning, as there is nothing to fetch for them.
pub fn parse_prospect_csv(raw: &str) -> Result<Vec<ProspectRow>> {
    let mut reader = csv::Reader::from_reader(raw.as_bytes());
    let headers = reader.headers().context("Feed CSV has no header row")?.clone();
    anyhow::ensure!(
        headers.iter().any(|h| h == "transcript"),
        "Feed CSV has no `transcript` column"
    );

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Feed CSV row decode failed")?;
        let mut fields = BTreeMap::new();
        for (key, value) in headers.iter().zip(record.iter()) {
            fields.insert(key.to_string(), value.to_string());
        }
        let transcript_url = fields.get("transcript").cloned().unwrap_or_default();
        if transcript_url.is_empty() {
            warn!("Feed row without a transcript URL, skipping");
            continue;
        }
        rows.push(ProspectRow {
            transcript_url,
            fields,
        });
    }
    Ok(rows)
}

pub struct HttpProspectFeed {
    client: reqwest::Client,
    base_url: String,
    /// Where the raw response is kept as an audit artifact.
    raw_dir: PathBuf,
}

impl HttpProspectFeed {
    pub fn new(base_url: &str, raw_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FEED_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.to_string(),
            raw_dir,
        }
    }
}

#[async_trait]
impl ProspectFeed for HttpProspectFeed {
    async fn daily_prospects(&self, date: &DateSpec) -> Result<Vec<ProspectRow>> {
        let today = Utc::now().date_naive();
        let url = build_url(&self.base_url, date, today);
        info!(url, "Fetching daily prospect feed");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Prospect feed request failed")?
            .error_for_status()
            .context("Prospect feed returned an error status")?;
        let raw = response
            .text()
            .await
            .context("Prospect feed body read failed")?;

        // Audit artifact, named by the queried range. Failing to keep a
        // copy is not worth aborting the run over.
        let (start, end) = date.range(today);
        let artifact = self.raw_dir.join(format!("prospects_{start}_{end}.csv"));
        if let Err(e) = atomic_write(&artifact, raw.as_bytes()) {
            warn!(path = %artifact.display(), error = %e, "Failed to save raw feed artifact");
        }

        let rows = parse_prospect_csv(&raw)?;
        info!(prospects = rows.len(), "Prospect feed decoded");
        Ok(rows)
    }
}
