//! Push error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Token registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Push platform error: {0}")]
    Platform(String),

    #[error("Storage error: {0}")]
    Storage(#[from] webshell_storage::StorageError),
}
