//! Handoff seam for the outreach dashboard.

use async_trait::async_trait;
use tracing::info;

use handoff_common::OutreachDecision;

/// Consumer of the ReadyNow bucket. Every row it receives carries
/// `seconds_elapsed` above the outreach threshold.
#[async_trait]
pub trait OutreachSink: Send + Sync {
    async fn deliver(&self, ready: &[OutreachDecision]) -> anyhow::Result<()>;
}

/// Sink that logs and drops. Used until a real dashboard consumer exists,
/// and in tests.
pub struct NoopSink;

#[async_trait]
impl OutreachSink for NoopSink {
    async fn deliver(&self, ready: &[OutreachDecision]) -> anyhow::Result<()> {
        info!(transcripts = ready.len(), "ReadyNow bucket dropped (no sink configured)");
        Ok(())
    }
}
