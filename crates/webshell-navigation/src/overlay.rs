//! Overlay Surface Manager
//!
//! At most one overlay exists. Opening a new one replaces the current one
//! instead of stacking.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

use crate::state::OverlayState;
use crate::surface::OverlaySurface;

/// URL fragments that mark the end of a payment flow.
pub const SUCCESS_PATTERNS: &[&str] = &["success", "complete", "finish", "return", "callback"];

pub fn is_completion_url(url: &str) -> bool {
    let url = url.to_lowercase();
    SUCCESS_PATTERNS.iter().any(|p| url.contains(p))
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayBack {
    /// Stepped back inside the overlay's own history
    WentBack,
    /// History was empty, the overlay is gone
    Closed(OverlayState),
    NoOverlay,
}

pub struct OverlayManager {
    state: Arc<RwLock<Option<OverlayState>>>,
    pre_content_script: Arc<RwLock<Option<String>>>,
    surface: Arc<dyn OverlaySurface>,
}

impl OverlayManager {
    pub fn new(surface: Arc<dyn OverlaySurface>) -> Self {
        Self {
            state: Arc::new(RwLock::new(None)),
            pre_content_script: Arc::new(RwLock::new(None)),
            surface,
        }
    }

    /// Installed on the surface ahead of every `present`.
    pub fn set_pre_content_script(&self, script: &str) {
        *self.pre_content_script.write() = Some(script.to_string());
    }

    pub fn current(&self) -> Option<OverlayState> {
        self.state.read().clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.read().is_some()
    }

    /// Open `url` in the overlay, replacing any overlay already shown.
    pub fn open(&self, url: &str) -> OverlayState {
        let overlay = OverlayState {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            title: String::new(),
            can_go_back: false,
            opened_at: Utc::now(),
        };

        let replaced = self.state.write().replace(overlay.clone());
        if let Some(previous) = replaced {
            tracing::info!(overlay_id = %previous.id, "Replacing open overlay");
            self.surface.dismiss();
        }

        let pre_content = self.pre_content_script.read().clone();
        if let Some(script) = pre_content {
            self.surface.set_pre_content_script(&script);
        }
        self.surface.present(url);
        tracing::info!(overlay_id = %overlay.id, url = %url, "Opened overlay");

        overlay
    }

    /// Remove the overlay. Returns what was closed, if anything.
    pub fn close(&self) -> Option<OverlayState> {
        let closed = self.state.write().take();
        if let Some(overlay) = &closed {
            self.surface.dismiss();
            tracing::info!(overlay_id = %overlay.id, "Closed overlay");
        }
        closed
    }

    pub fn go_back(&self) -> OverlayBack {
        let can_go_back = match self.state.read().as_ref() {
            Some(overlay) => overlay.can_go_back,
            None => return OverlayBack::NoOverlay,
        };

        if can_go_back {
            self.surface.go_back();
            return OverlayBack::WentBack;
        }

        match self.close() {
            Some(closed) => OverlayBack::Closed(closed),
            None => OverlayBack::NoOverlay,
        }
    }

    /// Track the overlay's own navigation. Returns true when the new URL
    /// looks like the end of a payment flow.
    pub fn on_navigation_state_changed(&self, url: &str, can_go_back: bool, title: Option<&str>) -> bool {
        let mut guard = self.state.write();
        let Some(overlay) = guard.as_mut() else {
            tracing::debug!(url = %url, "Overlay navigation event without an overlay");
            return false;
        };

        overlay.url = url.to_string();
        overlay.can_go_back = can_go_back;
        if let Some(title) = title {
            overlay.title = title.to_string();
        }

        is_completion_url(url)
    }

    pub fn inject_script(&self, script: &str) {
        if self.is_open() {
            self.surface.inject_script(script);
        }
    }
}

impl Clone for OverlayManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            pre_content_script: Arc::clone(&self.pre_content_script),
            surface: Arc::clone(&self.surface),
        }
    }
}
