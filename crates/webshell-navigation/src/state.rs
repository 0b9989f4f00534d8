//! Navigation state machine
//!
//! ```text
//! Idle
//!   ↓ start navigation
//! Loading ←──────┐
//!   ↓ page loaded │ new navigation
//!   ↓ progress    │
//!   ↓ timeout     │
//! Ready ─────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    /// Nothing requested yet
    Idle,
    /// A navigation is in flight and the spinner is visible
    Loading,
    /// Content is shown (or the loading timeout gave up waiting)
    Ready,
}

impl LoadPhase {
    pub fn can_transition_to(&self, target: LoadPhase) -> bool {
        match (self, target) {
            (LoadPhase::Idle, LoadPhase::Loading) => true,
            // Every new navigation re-enters Loading
            (LoadPhase::Loading, LoadPhase::Loading) => true,
            (LoadPhase::Ready, LoadPhase::Loading) => true,
            (LoadPhase::Loading, LoadPhase::Ready) => true,
            (LoadPhase::Ready, LoadPhase::Ready) => true,
            (LoadPhase::Idle, LoadPhase::Idle) => true,
            _ => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadPhase::Loading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadPhase::Idle => "idle",
            LoadPhase::Loading => "loading",
            LoadPhase::Ready => "ready",
        }
    }
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The secondary browsing context. Its history never mixes with the primary one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayState {
    pub id: String,
    pub url: String,
    pub title: String,
    pub can_go_back: bool,
    pub opened_at: DateTime<Utc>,
}

/// Snapshot handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    pub current_url: String,
    pub can_go_back: bool,
    pub is_loading: bool,
    pub overlay: Option<OverlayState>,
}
