//! Recording host shared by the scenario tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use webshell_core::{
    Config, Database, DisplayControl, ExternalOpener, HandoffError, NotificationAlert,
    NotificationPresenter, Orientation, OverlaySurface, PermissionStatus, PrimarySurface,
    PushError, PushPlatform, RouterHost, Shell, ShellHost, UserPrompt,
};

#[derive(Default)]
pub struct RecordingHost {
    /// URL prefixes an installed app (or the browser) can open
    pub installed: Vec<String>,
    pub calls: Mutex<Vec<String>>,
    pub primary_scripts: Mutex<Vec<String>>,
    pub overlay_scripts: Mutex<Vec<String>>,
    /// `(surface, script)` in installation order
    pub pre_content: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingHost {
    pub fn with_installed(prefixes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            installed: prefixes.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        })
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn loads(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| c.strip_prefix("primary.load ").map(str::to_string))
            .collect()
    }

    pub fn primary_scripts(&self) -> Vec<String> {
        self.primary_scripts.lock().clone()
    }
}

impl PrimarySurface for RecordingHost {
    fn load_url(&self, url: &str) {
        self.record(format!("primary.load {}", url));
    }
    fn reload(&self) {
        self.record("primary.reload".to_string());
    }
    fn go_back(&self) {
        self.record("primary.back".to_string());
    }
    fn inject_script(&self, script: &str) {
        self.primary_scripts.lock().push(script.to_string());
    }
    fn set_pre_content_script(&self, script: &str) {
        self.pre_content.lock().push(("primary", script.to_string()));
    }
}

impl OverlaySurface for RecordingHost {
    fn present(&self, url: &str) {
        self.record(format!("overlay.present {}", url));
    }
    fn go_back(&self) {
        self.record("overlay.back".to_string());
    }
    fn dismiss(&self) {
        self.record("overlay.dismiss".to_string());
    }
    fn inject_script(&self, script: &str) {
        self.overlay_scripts.lock().push(script.to_string());
    }
    fn set_pre_content_script(&self, script: &str) {
        self.pre_content.lock().push(("overlay", script.to_string()));
        self.record("overlay.pre_content".to_string());
    }
}

impl ExternalOpener for RecordingHost {
    fn can_open(&self, url: &str) -> bool {
        self.installed.iter().any(|p| url.starts_with(p.as_str()))
    }
    fn open(&self, url: &str) -> Result<(), HandoffError> {
        if self.can_open(url) {
            self.record(format!("open {}", url));
            Ok(())
        } else {
            Err(HandoffError::Unavailable(url.to_string()))
        }
    }
}

impl UserPrompt for RecordingHost {
    fn load_failed(&self, url: &str, _description: &str) {
        self.record(format!("prompt.load_failed {}", url));
    }
    fn app_not_installed(&self, app_name: Option<&str>, install_url: Option<&str>) {
        self.record(format!(
            "prompt.app_not_installed {} {}",
            app_name.unwrap_or("-"),
            install_url.unwrap_or("-")
        ));
    }
}

impl DisplayControl for RecordingHost {
    fn lock_orientation(&self, orientation: Orientation) {
        self.record(format!("display.lock {}", orientation.as_str()));
    }
}

impl NotificationPresenter for RecordingHost {
    fn show_alert(&self, alert: &NotificationAlert) {
        self.record(format!("alert {}", alert.title));
    }
}

pub fn shell_host(host: &Arc<RecordingHost>) -> ShellHost {
    ShellHost {
        router: RouterHost {
            primary: host.clone(),
            overlay: host.clone(),
            opener: host.clone(),
            prompt: host.clone(),
        },
        display: host.clone(),
        notifications: host.clone(),
    }
}

pub fn test_config() -> Config {
    let mut config = Config::new(std::env::temp_dir().join("webshell-tests"));
    config.base_url = "https://shop.example".to_string();
    config.extra_store_hosts.push("market.example".to_string());
    config
}

pub fn build_shell(config: Config, host: &Arc<RecordingHost>, db: Database) -> Shell {
    Shell::with_database(config, db, shell_host(host), None)
}

pub struct FakePushPlatform {
    pub permission: PermissionStatus,
    pub token: Option<String>,
}

impl FakePushPlatform {
    pub fn new(permission: PermissionStatus, token: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            permission,
            token: token.map(str::to_string),
        })
    }
}

#[async_trait]
impl PushPlatform for FakePushPlatform {
    async fn request_permission(&self) -> Result<PermissionStatus, PushError> {
        Ok(self.permission)
    }

    async fn fetch_token(&self) -> Result<Option<String>, PushError> {
        Ok(self.token.clone())
    }

    async fn delete_token(&self) -> Result<(), PushError> {
        Ok(())
    }

    async fn subscribe_topic(&self, _topic: &str) -> Result<(), PushError> {
        Ok(())
    }

    async fn unsubscribe_topic(&self, _topic: &str) -> Result<(), PushError> {
        Ok(())
    }
}
