//! Push token value and its shared read handle

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushToken {
    pub value: String,
    pub issued_at: DateTime<Utc>,
}

impl PushToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            issued_at: Utc::now(),
        }
    }
}

/// Read access to the current token for the bridge and the router. Only the
/// lifecycle writes through it.
#[derive(Debug, Clone, Default)]
pub struct TokenHandle {
    inner: Arc<RwLock<Option<PushToken>>>,
}

impl TokenHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<PushToken> {
        self.inner.read().clone()
    }

    /// Token string, if any.
    pub fn value(&self) -> Option<String> {
        self.inner.read().as_ref().map(|t| t.value.clone())
    }

    pub(crate) fn set(&self, token: Option<PushToken>) {
        *self.inner.write() = token;
    }
}
