//! Navigation error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Page failed to load: {url} ({description})")]
    LoadFailed { url: String, description: String },

    #[error("No load error is awaiting a decision")]
    NoPendingLoadError,
}

/// Failure to hand a URL to an external application.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    #[error("No application can open {0}")]
    Unavailable(String),

    #[error("Host refused to open {url}: {reason}")]
    OpenFailed { url: String, reason: String },
}
