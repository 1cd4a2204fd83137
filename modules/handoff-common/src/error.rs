use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, HandoffError>;

#[derive(Error, Debug)]
pub enum HandoffError {
    /// Network failure, timeout, or non-2xx for one transcript source.
    /// Non-fatal to the batch; carried in the run report.
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Embedded message block missing or malformed for one source.
    /// Non-fatal; the source's fingerprint is left untouched so it is
    /// retried on the next run.
    #[error("Extraction error for {url}: {message}")]
    Extraction { url: String, message: String },

    /// Store/export/snapshot read or write failure. Fatal to the run;
    /// atomic replace keeps prior durable state intact.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
