use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use handoff_common::{Config, DateSpec};
use handoff_pipeline::pipeline::OutreachPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("handoff_pipeline=info".parse()?))
        .init();

    info!("Handoff outreach pipeline starting...");

    let config = Config::from_env();
    let date = date_from_env()?;
    info!(data_dir = %config.data_dir.display(), ?date, "Configuration loaded");

    let pipeline = OutreachPipeline::from_config(&config);
    let report = pipeline.run(&date).await?;

    for failure in &report.failures {
        warn!(error = %failure, "Source failed this run");
    }
    info!("{}", report.stats);

    Ok(())
}

/// Optional target window from the environment: `TARGET_DATE=YYYY-MM-DD`
/// for a single day, `TARGET_MONTH` (with optional `TARGET_YEAR`) for a
/// whole month, `TARGET_YEAR` alone for a whole year. Default: today.
fn date_from_env() -> Result<DateSpec> {
    if let Ok(raw) = std::env::var("TARGET_DATE") {
        return Ok(DateSpec::Day(raw.parse()?));
    }

    let year: Option<i32> = std::env::var("TARGET_YEAR")
        .ok()
        .map(|y| y.parse())
        .transpose()?;

    if let Ok(raw) = std::env::var("TARGET_MONTH") {
        let month: u32 = raw.parse()?;
        anyhow::ensure!((1..=12).contains(&month), "TARGET_MONTH must be 1..=12");
        return Ok(DateSpec::Month { year, month });
    }

    if let Some(year) = year {
        return Ok(DateSpec::Year(year));
    }

    Ok(DateSpec::Today)
}
