use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PagefeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {}s navigating to {url}", .timeout.as_secs())]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("Timed out after {}s waiting for {state} on {url}", .timeout.as_secs())]
    LoadStateTimeout {
        url: String,
        state: &'static str,
        timeout: Duration,
    },

    #[error("Feed write error: {0}")]
    FeedWrite(String),
}

pub type Result<T> = std::result::Result<T, PagefeedError>;
