//! External hand-off execution
//!
//! Intent URIs: direct launch → embedded fallback URL → market page for the
//! embedded package → "app not installed".
//! Other schemes: `can_open` check → launch, otherwise "app not installed"
//! with an install offer for apps the shell knows.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::classifier::{known_app_for_package, known_app_for_scheme, KnownApp};
use crate::surface::{ExternalOpener, UserPrompt};
use crate::target::NavigationTarget;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

impl Platform {
    /// Install page for a known app on this platform.
    pub fn install_url(&self, app: &KnownApp) -> String {
        match self {
            Platform::Android => market_url(app.package),
            Platform::Ios => app.app_store_url.to_string(),
        }
    }
}

pub fn market_url(package: &str) -> String {
    format!("market://details?id={}", package)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoffOutcome {
    Opened(String),
    OpenedFallback(String),
    OpenedMarket(String),
    Unavailable {
        app_name: Option<String>,
        install_url: Option<String>,
    },
}

impl HandoffOutcome {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, HandoffOutcome::Unavailable { .. })
    }
}

pub struct HandoffExecutor {
    opener: Arc<dyn ExternalOpener>,
    prompt: Arc<dyn UserPrompt>,
    platform: Platform,
}

impl HandoffExecutor {
    pub fn new(opener: Arc<dyn ExternalOpener>, prompt: Arc<dyn UserPrompt>, platform: Platform) -> Self {
        Self {
            opener,
            prompt,
            platform,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn execute(
        &self,
        target: &NavigationTarget,
        target_app: Option<&str>,
        fallback_url: Option<&str>,
    ) -> HandoffOutcome {
        tracing::info!(url = %target.raw_url, "Handing off to external app");

        let outcome = if target.scheme == "intent" {
            self.execute_intent(target, target_app, fallback_url)
        } else {
            self.execute_scheme(target)
        };

        if let HandoffOutcome::Unavailable {
            app_name,
            install_url,
        } = &outcome
        {
            tracing::warn!(
                url = %target.raw_url,
                install_url = ?install_url,
                "No application available for hand-off"
            );
            self.prompt
                .app_not_installed(app_name.as_deref(), install_url.as_deref());
        }

        outcome
    }

    /// Open an install page the user accepted from an earlier notice.
    pub fn open_install_page(&self, url: &str) -> bool {
        match self.opener.open(url) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to open install page");
                false
            }
        }
    }

    fn execute_intent(
        &self,
        target: &NavigationTarget,
        target_app: Option<&str>,
        fallback_url: Option<&str>,
    ) -> HandoffOutcome {
        match self.opener.open(&target.raw_url) {
            Ok(()) => return HandoffOutcome::Opened(target.raw_url.clone()),
            Err(e) => tracing::info!(error = %e, "Intent launch failed, trying fallbacks"),
        }

        if let Some(fallback) = fallback_url {
            match self.opener.open(fallback) {
                Ok(()) => return HandoffOutcome::OpenedFallback(fallback.to_string()),
                Err(e) => tracing::warn!(url = %fallback, error = %e, "Fallback URL failed"),
            }
        }

        if let Some(package) = target_app {
            let market = market_url(package);
            match self.opener.open(&market) {
                Ok(()) => return HandoffOutcome::OpenedMarket(market),
                Err(e) => tracing::warn!(url = %market, error = %e, "Market page failed"),
            }
        }

        HandoffOutcome::Unavailable {
            app_name: target_app
                .and_then(known_app_for_package)
                .map(|app| app.name.to_string()),
            install_url: None,
        }
    }

    fn execute_scheme(&self, target: &NavigationTarget) -> HandoffOutcome {
        if self.opener.can_open(&target.raw_url) {
            match self.opener.open(&target.raw_url) {
                Ok(()) => return HandoffOutcome::Opened(target.raw_url.clone()),
                Err(e) => tracing::warn!(url = %target.raw_url, error = %e, "Open failed"),
            }
        }

        let known = known_app_for_scheme(&target.scheme);
        HandoffOutcome::Unavailable {
            app_name: known.map(|app| app.name.to_string()),
            install_url: known.map(|app| self.platform.install_url(app)),
        }
    }
}
