//! Shell coordinator
//!
//! Wires the router, bridge, deep link queue and push lifecycle together and
//! is the single entry point for host events. Components only know each
//! other through the callbacks registered here.

use parking_lot::RwLock;
use std::sync::Arc;

use webshell_bridge::{scripts, HostAction, MessageBridge, MessageSource};
use webshell_deeplink::{
    build_webview_url, DeepLinkError, DeepLinkQueue, EnqueueOutcome, LastDeepLink, ParsedLink,
};
use webshell_navigation::{
    LoadPhase, NavigationRouter, NavigationState, NavigationTarget, RequestOrigin, RoutingDecision,
};
use webshell_push::{
    NotificationAlert, NotificationEvent, NotificationOutcome, NotificationPayload,
    NotificationProcessor, PushPlatform, PushToken, PushTokenLifecycle, TokenHandle,
};
use webshell_storage::{keys, Database};

use crate::config::Config;
use crate::host::ShellHost;
use crate::Result;

pub struct Shell {
    config: Config,
    db: Database,
    host: ShellHost,
    router: NavigationRouter,
    bridge: MessageBridge,
    deep_links: DeepLinkQueue,
    push: Option<PushTokenLifecycle>,
    token: TokenHandle,
    notifications: NotificationProcessor,
    base_url: Arc<RwLock<String>>,
}

impl Shell {
    /// Open the database from `config` and build the shell.
    pub fn new(config: Config, host: ShellHost, push_platform: Option<Arc<dyn PushPlatform>>) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        config.validate()?;

        let db = Database::open(&config.database_path)?;
        Ok(Self::with_database(config, db, host, push_platform))
    }

    pub fn with_database(
        config: Config,
        db: Database,
        host: ShellHost,
        push_platform: Option<Arc<dyn PushPlatform>>,
    ) -> Self {
        let router = NavigationRouter::new(
            host.router.clone(),
            config.classifier(),
            config.platform,
            config.timing(),
        );

        let push = match (&config.push, push_platform) {
            (Some(_), Some(platform)) => Some(PushTokenLifecycle::new(platform, db.clone())),
            (Some(_), None) => {
                tracing::warn!("Push configured but no push platform available");
                None
            }
            (None, _) => {
                tracing::info!("No push configuration, running without push token");
                None
            }
        };
        let token = push
            .as_ref()
            .map(PushTokenLifecycle::handle)
            .unwrap_or_default();

        let shell = Self {
            base_url: Arc::new(RwLock::new(config.base_url.clone())),
            bridge: MessageBridge::new(token.clone()),
            deep_links: DeepLinkQueue::new(db.clone()),
            notifications: NotificationProcessor::new(db.clone()),
            config,
            db,
            host,
            router,
            push,
            token,
        };
        shell.router.install_pre_content_scripts(
            scripts::PRIMARY_PRE_CONTENT_SCRIPT,
            scripts::OVERLAY_PRE_CONTENT_SCRIPT,
        );
        shell.wire();
        shell
    }

    fn wire(&self) {
        // Keep the last announced URL durable
        let db = self.db.clone();
        self.router.on_url_change(Arc::new(move |url: &str| {
            if let Err(e) = db.set(keys::LAST_URL, url) {
                tracing::error!(url = %url, error = %e, "Failed to persist last URL");
            }
        }));

        // Refreshed tokens go into the next navigations and to the page
        if let Some(push) = &self.push {
            let router = self.router.clone();
            push.on_refresh(Arc::new(move |token: &PushToken| {
                router.set_push_token(Some(token.value.clone()));
                if router.phase() != LoadPhase::Idle {
                    router.inject_script(&scripts::token_response_script(Some(&token.value)));
                }
            }));
        }

        // Every valid link is announced to the page
        let router = self.router.clone();
        let announce = move |link: &ParsedLink| -> webshell_deeplink::Result<()> {
            if router.phase() != LoadPhase::Idle {
                let data =
                    serde_json::to_value(link).map_err(|e| DeepLinkError::Handler(e.to_string()))?;
                router.inject_script(&scripts::deep_link_script(&link.full_url, &data));
            }
            Ok(())
        };
        self.deep_links.add_handler(Arc::new(announce));
    }

    // === Accessors ===

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &NavigationRouter {
        &self.router
    }

    pub fn bridge(&self) -> &MessageBridge {
        &self.bridge
    }

    pub fn deep_links(&self) -> &DeepLinkQueue {
        &self.deep_links
    }

    pub fn push(&self) -> Option<&PushTokenLifecycle> {
        self.push.as_ref()
    }

    pub fn token(&self) -> Option<String> {
        self.token.value()
    }

    pub fn snapshot(&self) -> NavigationState {
        self.router.snapshot()
    }

    pub fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    pub fn last_url(&self) -> Result<Option<String>> {
        Ok(self.db.get(keys::LAST_URL)?)
    }

    pub fn last_deep_link(&self) -> Result<LastDeepLink> {
        Ok(self.deep_links.last_deep_link()?)
    }

    // === Lifecycle ===

    /// Acquire the push token (if enabled), load the base URL and start
    /// taking deep links. Returns the URL loaded into the primary surface.
    pub async fn start(&self) -> Result<String> {
        if let Some(push) = &self.push {
            match push.initialize().await {
                Ok(token) => self.router.set_push_token(Some(token.value)),
                Err(e) => tracing::warn!(error = %e, "Continuing without push token"),
            }
        }

        let base_url = match self.db.get(keys::BASE_URL)? {
            Some(stored) if !stored.trim().is_empty() => stored,
            _ => self.config.base_url.clone(),
        };
        *self.base_url.write() = base_url.clone();

        tracing::info!(url = %base_url, "Starting shell");
        let loaded = self.router.navigate(&base_url)?;

        let router = self.router.clone();
        let base = Arc::clone(&self.base_url);
        let consumer = Arc::new(move |url: &str| {
            let target = link_target(&base.read(), url);
            if let Err(e) = router.navigate(&target) {
                tracing::warn!(url = %url, error = %e, "Deep link could not be opened");
            }
        });
        if let Some(url) = self.deep_links.attach_consumer(consumer)? {
            tracing::info!(url = %url, "Opened deep link received before start");
        }

        Ok(loaded)
    }

    // === Host events ===

    /// OS delivered a link (cold or warm start).
    pub fn on_incoming_link(&self, url: &str) -> Result<EnqueueOutcome> {
        Ok(self.deep_links.enqueue(url)?)
    }

    /// Raw message from one of the surfaces.
    pub fn on_bridge_message(&self, raw: &str, source: MessageSource) -> HostAction {
        let action = self.bridge.handle_raw(raw, source);
        self.apply(&action);
        action
    }

    fn apply(&self, action: &HostAction) {
        match action {
            HostAction::LockOrientation(orientation) => {
                self.host.display.lock_orientation(*orientation);
            }
            HostAction::InjectScript { target, script } => match target {
                MessageSource::Primary => self.router.inject_script(script),
                MessageSource::Overlay => self.router.overlay().inject_script(script),
            },
            HostAction::MarkPageLoaded => {
                self.router.on_page_loaded();
            }
            HostAction::ScheduleOverlayClose => {
                self.router.schedule_overlay_close();
            }
            HostAction::DismissOverlay => {
                self.router.dismiss_overlay();
            }
            HostAction::GoBack(MessageSource::Primary) => {
                self.router.go_back();
            }
            HostAction::GoBack(MessageSource::Overlay) => {
                self.router.overlay_go_back();
            }
            HostAction::OpenOverlay(url) => {
                self.router.on_open_window(url);
            }
            HostAction::Ignore => {}
        }
    }

    pub fn on_load_start(&self, url: &str) -> u64 {
        self.router.start_navigation(url)
    }

    /// The primary surface finished a load: hide the spinner and install the
    /// page-facing globals.
    pub fn on_load_finished(&self) {
        self.router.on_page_loaded();
        self.router.inject_script(&self.bridge.primary_page_script());
    }

    pub fn on_load_progress(&self, fraction: f64) {
        self.router.on_load_progress(fraction);
    }

    pub fn on_navigation_state_changed(&self, url: &str, can_go_back: bool) {
        self.router.on_navigation_state_changed(url, can_go_back);
    }

    pub fn on_load_error(&self, description: &str) {
        self.router.on_load_error(description);
    }

    pub fn should_start_load(&self, url: &str, origin: RequestOrigin) -> bool {
        self.router.should_start_load(url, origin)
    }

    pub fn on_open_window(&self, url: &str) -> RoutingDecision {
        self.router.on_open_window(url)
    }

    pub fn on_overlay_load_finished(&self) {
        self.router.overlay().inject_script(scripts::OVERLAY_PAGE_SCRIPT);
    }

    pub fn on_overlay_navigation_state_changed(&self, url: &str, can_go_back: bool, title: Option<&str>) {
        self.router
            .on_overlay_navigation_state_changed(url, can_go_back, title);
    }

    /// Hardware back button.
    pub fn handle_back(&self) -> bool {
        self.router.handle_back()
    }

    // === Push ===

    pub fn on_token_refresh(&self, value: &str) -> Option<PushToken> {
        match &self.push {
            Some(push) => push.handle_refresh(value),
            None => {
                tracing::debug!("Token refresh ignored, push disabled");
                None
            }
        }
    }

    pub fn on_notification(&self, event: NotificationEvent, payload: &NotificationPayload) -> NotificationOutcome {
        let outcome = self.notifications.process(event, payload);

        if self.router.phase() != LoadPhase::Idle {
            match serde_json::to_value(&outcome.record) {
                Ok(data) => self.router.inject_script(&scripts::notification_script(&data)),
                Err(e) => tracing::error!(error = %e, "Failed to encode notification record"),
            }
        }

        if let Some(alert) = &outcome.alert {
            self.host.notifications.show_alert(alert);
        }

        if let Some(url) = &outcome.deep_link {
            if let Err(e) = self.on_incoming_link(url) {
                tracing::warn!(url = %url, error = %e, "Notification link rejected");
            }
        }

        outcome
    }

    /// User confirmed a foreground notification alert.
    pub fn accept_notification(&self, alert: &NotificationAlert) -> Result<Option<EnqueueOutcome>> {
        match &alert.link {
            Some(url) => Ok(Some(self.on_incoming_link(url)?)),
            None => Ok(None),
        }
    }

    /// User accepted the install offer after a failed hand-off.
    pub fn accept_install(&self, install_url: &str) -> bool {
        self.router.handoff().open_install_page(install_url)
    }
}

impl Clone for Shell {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            db: self.db.clone(),
            host: self.host.clone(),
            router: self.router.clone(),
            bridge: self.bridge.clone(),
            deep_links: self.deep_links.clone(),
            push: self.push.clone(),
            token: self.token.clone(),
            notifications: self.notifications.clone(),
            base_url: Arc::clone(&self.base_url),
        }
    }
}

/// Where a delivered deep link takes the primary surface. Web links load
/// as they are; app links become the base URL with the link's parameters.
pub fn link_target(base_url: &str, url: &str) -> String {
    match NavigationTarget::parse(url) {
        Ok(target) if target.is_http() => url.to_string(),
        _ => match ParsedLink::parse(url) {
            Ok(link) => build_webview_url(base_url, Some(&link), None),
            Err(_) => build_webview_url(base_url, None, None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_target_web_link_loads_directly() {
        assert_eq!(
            link_target("https://vpvmall.com", "https://vpvmall.com/item/3"),
            "https://vpvmall.com/item/3"
        );
    }

    #[test]
    fn test_link_target_app_link_maps_onto_base() {
        assert_eq!(
            link_target("https://vpvmall.com", "app://product/42?ref=push"),
            "https://vpvmall.com/?ref=push&deeplink_path=product%2F42&source=deeplink"
        );
    }
}
