//! Capability interfaces implemented by the host adapter.
//!
//! The router never looks up a surface globally; everything it can do to the
//! outside world is one of these traits, handed in at construction.

use std::sync::Arc;

use crate::error::HandoffError;

/// The full-screen embedded browser surface.
pub trait PrimarySurface: Send + Sync {
    fn load_url(&self, url: &str);
    fn reload(&self);
    /// Step back in the surface's own history.
    fn go_back(&self);
    fn inject_script(&self, script: &str);
    /// Script run before any page content on every subsequent load.
    fn set_pre_content_script(&self, script: &str);
}

/// The secondary modal surface used for popups and payment windows.
pub trait OverlaySurface: Send + Sync {
    fn present(&self, url: &str);
    fn go_back(&self);
    fn dismiss(&self);
    fn inject_script(&self, script: &str);
    /// Script run before any page content of the next presented overlay.
    fn set_pre_content_script(&self, script: &str);
}

/// Host-OS URL primitives.
pub trait ExternalOpener: Send + Sync {
    fn can_open(&self, url: &str) -> bool;
    fn open(&self, url: &str) -> Result<(), HandoffError>;
}

/// User-facing notices and choices.
pub trait UserPrompt: Send + Sync {
    /// The page failed to load; the user picks retry or cancel, which the
    /// host reports back through `NavigationRouter::retry_load` or
    /// `NavigationRouter::cancel_load_error`.
    fn load_failed(&self, url: &str, description: &str);

    /// No application handles the hand-off. `install_url` is set when a
    /// market-install path exists.
    fn app_not_installed(&self, app_name: Option<&str>, install_url: Option<&str>);
}

/// Everything the router needs from the host.
#[derive(Clone)]
pub struct RouterHost {
    pub primary: Arc<dyn PrimarySurface>,
    pub overlay: Arc<dyn OverlaySurface>,
    pub opener: Arc<dyn ExternalOpener>,
    pub prompt: Arc<dyn UserPrompt>,
}
