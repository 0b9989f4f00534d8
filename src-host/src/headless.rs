//! Headless capability implementations.
//!
//! Every call a real host would make on a surface or the OS is logged
//! instead. Installed apps and the push token come from the environment.

use async_trait::async_trait;
use std::sync::Arc;

use webshell_core::{
    DisplayControl, ExternalOpener, HandoffError, NotificationAlert, NotificationPresenter,
    Orientation, OverlaySurface, PermissionStatus, PrimarySurface, PushError, PushPlatform,
    RouterHost, ShellHost, UserPrompt,
};

const ENV_INSTALLED_APPS: &str = "WEBSHELL_INSTALLED_APPS";
const ENV_PUSH_TOKEN: &str = "WEBSHELL_PUSH_TOKEN";

pub struct LoggingHost {
    /// URL prefixes the pretend OS can open
    installed: Vec<String>,
}

impl LoggingHost {
    pub fn from_env() -> Arc<Self> {
        let mut installed = vec!["http://".to_string(), "https://".to_string()];
        if let Ok(apps) = std::env::var(ENV_INSTALLED_APPS) {
            installed.extend(
                apps.split(',')
                    .map(str::trim)
                    .filter(|prefix| !prefix.is_empty())
                    .map(str::to_string),
            );
        }
        Arc::new(Self { installed })
    }

    pub fn shell_host(self: &Arc<Self>) -> ShellHost {
        ShellHost {
            router: RouterHost {
                primary: Arc::new(Primary),
                overlay: Arc::new(Overlay),
                opener: self.clone(),
                prompt: self.clone(),
            },
            display: self.clone(),
            notifications: self.clone(),
        }
    }
}

struct Primary;

impl PrimarySurface for Primary {
    fn load_url(&self, url: &str) {
        tracing::info!(surface = "primary", url = %url, "load_url");
    }

    fn reload(&self) {
        tracing::info!(surface = "primary", "reload");
    }

    fn go_back(&self) {
        tracing::info!(surface = "primary", "go_back");
    }

    fn inject_script(&self, script: &str) {
        tracing::info!(surface = "primary", bytes = script.len(), "inject_script");
        tracing::trace!(script = %script);
    }

    fn set_pre_content_script(&self, script: &str) {
        tracing::info!(surface = "primary", bytes = script.len(), "set_pre_content_script");
    }
}

struct Overlay;

impl OverlaySurface for Overlay {
    fn present(&self, url: &str) {
        tracing::info!(surface = "overlay", url = %url, "present");
    }

    fn go_back(&self) {
        tracing::info!(surface = "overlay", "go_back");
    }

    fn dismiss(&self) {
        tracing::info!(surface = "overlay", "dismiss");
    }

    fn inject_script(&self, script: &str) {
        tracing::info!(surface = "overlay", bytes = script.len(), "inject_script");
        tracing::trace!(script = %script);
    }

    fn set_pre_content_script(&self, script: &str) {
        tracing::info!(surface = "overlay", bytes = script.len(), "set_pre_content_script");
    }
}

impl ExternalOpener for LoggingHost {
    fn can_open(&self, url: &str) -> bool {
        self.installed.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }

    fn open(&self, url: &str) -> Result<(), HandoffError> {
        if !self.can_open(url) {
            return Err(HandoffError::Unavailable(url.to_string()));
        }
        tracing::info!(url = %url, "open external");
        Ok(())
    }
}

impl UserPrompt for LoggingHost {
    fn load_failed(&self, url: &str, description: &str) {
        tracing::warn!(url = %url, description = %description, "prompt: load failed (retry/cancel)");
    }

    fn app_not_installed(&self, app_name: Option<&str>, install_url: Option<&str>) {
        tracing::warn!(app = ?app_name, install_url = ?install_url, "prompt: app not installed");
    }
}

impl DisplayControl for LoggingHost {
    fn lock_orientation(&self, orientation: Orientation) {
        tracing::info!(orientation = %orientation.as_str(), "lock orientation");
    }
}

impl NotificationPresenter for LoggingHost {
    fn show_alert(&self, alert: &NotificationAlert) {
        tracing::info!(title = %alert.title, body = %alert.body, link = ?alert.link, "alert");
    }
}

/// Push platform backed by `WEBSHELL_PUSH_TOKEN`. Without it permission is
/// denied.
pub struct HeadlessPush {
    token: Option<String>,
}

impl HeadlessPush {
    pub fn from_env() -> Arc<Self> {
        Arc::new(Self {
            token: std::env::var(ENV_PUSH_TOKEN).ok().filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl PushPlatform for HeadlessPush {
    async fn request_permission(&self) -> Result<PermissionStatus, PushError> {
        Ok(match self.token {
            Some(_) => PermissionStatus::Granted,
            None => PermissionStatus::Denied,
        })
    }

    async fn fetch_token(&self) -> Result<Option<String>, PushError> {
        Ok(self.token.clone())
    }

    async fn delete_token(&self) -> Result<(), PushError> {
        tracing::info!("delete push token");
        Ok(())
    }

    async fn subscribe_topic(&self, topic: &str) -> Result<(), PushError> {
        tracing::info!(topic = %topic, "subscribe topic");
        Ok(())
    }

    async fn unsubscribe_topic(&self, topic: &str) -> Result<(), PushError> {
        tracing::info!(topic = %topic, "unsubscribe topic");
        Ok(())
    }
}
