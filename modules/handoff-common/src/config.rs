use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the chatbot transcript API. The date-range query
    /// (`&startDate=..&endDate=..`) is appended per run.
    pub transcript_api_url: String,

    /// Root directory for run artifacts: fingerprint store, transcript
    /// export, waitlist snapshots, run logs. Default: `data`.
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            transcript_api_url: required_env("TRANSCRIPT_API_URL"),
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
