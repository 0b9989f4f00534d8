//! Shell configuration
//!
//! Precedence, lowest first: defaults, JSON config file, environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use webshell_navigation::{Platform, RouterTiming, UrlClassifier};

use crate::error::CoreError;
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://vpvmall.com";

const ENV_BASE_URL: &str = "WEBSHELL_BASE_URL";
const ENV_BASE_URL_FALLBACK: &str = "BASE_URL";
const ENV_DATA_DIR: &str = "WEBSHELL_DATA_DIR";

/// Push configuration bundle produced at packaging time. Its absence turns
/// push handling off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushConfig {
    pub project_id: String,
    pub app_id: String,
    #[serde(default)]
    pub sender_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Page loaded at start unless the store holds an override
    pub base_url: String,
    pub platform: Platform,
    pub push: Option<PushConfig>,
    pub loading_timeout_ms: u64,
    pub overlay_close_delay_ms: u64,
    pub load_progress_threshold: f64,
    /// Extra app-store hosts that hand off externally
    pub extra_store_hosts: Vec<String>,
    /// Extra schemes that hand off externally
    pub extra_payment_schemes: Vec<String>,
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        let timing = RouterTiming::default();

        Self {
            database_path: data_dir.join("webshell.db"),
            base_url: DEFAULT_BASE_URL.to_string(),
            platform: Platform::default(),
            push: None,
            loading_timeout_ms: timing.loading_timeout.as_millis() as u64,
            overlay_close_delay_ms: timing.overlay_close_delay.as_millis() as u64,
            load_progress_threshold: timing.progress_threshold,
            extra_store_hosts: Vec::new(),
            extra_payment_schemes: Vec::new(),
        }
    }

    /// Read a JSON config file, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)?;
        config.apply_env();
        config.validate()?;

        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL)
            .or_else(|| lookup(ENV_BASE_URL_FALLBACK))
            .filter(|url| !url.trim().is_empty());
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|dir| !dir.is_empty()) {
            self.database_path = PathBuf::from(dir).join("webshell.db");
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(CoreError::Config("base_url must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.load_progress_threshold) {
            return Err(CoreError::Config(format!(
                "load_progress_threshold out of range: {}",
                self.load_progress_threshold
            )));
        }
        Ok(())
    }

    pub fn timing(&self) -> RouterTiming {
        RouterTiming {
            loading_timeout: Duration::from_millis(self.loading_timeout_ms),
            progress_threshold: self.load_progress_threshold,
            overlay_close_delay: Duration::from_millis(self.overlay_close_delay_ms),
        }
    }

    pub fn classifier(&self) -> UrlClassifier {
        let classifier = self
            .extra_payment_schemes
            .iter()
            .fold(UrlClassifier::new(), |c, scheme| c.with_payment_scheme(scheme));
        self.extra_store_hosts
            .iter()
            .fold(classifier, |c, host| c.with_store_host(host))
    }

    pub fn push_enabled(&self) -> bool {
        self.push.is_some()
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Webshell"))
            .unwrap_or_else(|| PathBuf::from(".webshell"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}
