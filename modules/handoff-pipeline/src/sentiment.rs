//! Handoff seam for the external sentiment-scoring collaborator.
//!
//! The scoring models live outside this system; they take the assembled
//! message rows and annotate them independently. Only the handoff exists
//! here.

use async_trait::async_trait;

use handoff_common::MessageRecord;

#[async_trait]
pub trait SentimentAnnotator: Send + Sync {
    /// Hand the run's assembled rows to the scoring collaborator.
    async fn annotate(&self, records: &[MessageRecord]) -> anyhow::Result<()>;
}

/// Annotator that does nothing. Used when no scoring collaborator is
/// wired up, and in tests.
pub struct NoopAnnotator;

#[async_trait]
impl SentimentAnnotator for NoopAnnotator {
    async fn annotate(&self, _records: &[MessageRecord]) -> anyhow::Result<()> {
        Ok(())
    }
}
