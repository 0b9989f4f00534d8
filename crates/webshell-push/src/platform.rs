//! Push platform capability
//!
//! Registration internals live behind this trait; the lifecycle only needs
//! permission, a token value and the pass-through topic calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    /// Quiet delivery; still allows a token
    Provisional,
    Denied,
}

impl PermissionStatus {
    pub fn allows_token(&self) -> bool {
        matches!(self, PermissionStatus::Granted | PermissionStatus::Provisional)
    }
}

#[async_trait]
pub trait PushPlatform: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Ask the platform for a token. `None` means nothing was issued.
    async fn fetch_token(&self) -> Result<Option<String>>;

    async fn delete_token(&self) -> Result<()>;

    async fn subscribe_topic(&self, topic: &str) -> Result<()>;

    async fn unsubscribe_topic(&self, topic: &str) -> Result<()>;
}
