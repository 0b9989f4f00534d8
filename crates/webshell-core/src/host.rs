//! Host capabilities the shell drives, beyond what the router needs.

use std::sync::Arc;

use webshell_bridge::Orientation;
use webshell_navigation::RouterHost;
use webshell_push::NotificationAlert;

pub trait DisplayControl: Send + Sync {
    fn lock_orientation(&self, orientation: Orientation);
}

pub trait NotificationPresenter: Send + Sync {
    /// Show a foreground notification. If the user confirms and the alert
    /// carries a link, the host calls `Shell::accept_notification`.
    fn show_alert(&self, alert: &NotificationAlert);
}

/// Everything the shell talks to, handed in at construction.
#[derive(Clone)]
pub struct ShellHost {
    pub router: RouterHost,
    pub display: Arc<dyn DisplayControl>,
    pub notifications: Arc<dyn NotificationPresenter>,
}
