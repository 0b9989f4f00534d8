//! Deep link error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeepLinkError {
    #[error("Invalid deep link: {0}")]
    InvalidUrl(String),

    #[error("Deep link handler failed: {0}")]
    Handler(String),

    #[error("Storage error: {0}")]
    Storage(#[from] webshell_storage::StorageError),
}
