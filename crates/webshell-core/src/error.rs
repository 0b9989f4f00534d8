//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] webshell_storage::StorageError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] webshell_navigation::NavigationError),

    #[error("Deep link error: {0}")]
    DeepLink(#[from] webshell_deeplink::DeepLinkError),

    #[error("Push error: {0}")]
    Push(#[from] webshell_push::PushError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] webshell_bridge::BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
