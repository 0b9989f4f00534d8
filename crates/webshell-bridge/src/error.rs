//! Bridge error types

use thiserror::Error;

/// A page message that could not be understood. Logged and dropped by the
/// bridge, never propagated to the host.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Malformed bridge payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid bridge message: {0}")]
    InvalidMessage(String),
}
