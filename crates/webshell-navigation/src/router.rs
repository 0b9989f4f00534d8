//! Navigation Router
//!
//! Owns the single `current_url`, the loading indicator and the overlay
//! lifecycle. Host callbacks arrive in any order and from any task, so every
//! entry point is safe to re-enter: state changes are last-write-wins and no
//! lock is held while calling out to a surface.
//!
//! Timers (loading timeout, delayed overlay close) capture a generation
//! number when armed. A timer whose generation is no longer current does
//! nothing when it fires.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::classifier::{RequestOrigin, RoutingDecision, UrlClassifier};
use crate::error::NavigationError;
use crate::handoff::{HandoffExecutor, Platform};
use crate::overlay::{OverlayBack, OverlayManager};
use crate::state::{LoadPhase, NavigationState, OverlayState};
use crate::surface::{PrimarySurface, RouterHost, UserPrompt};
use crate::target::NavigationTarget;
use crate::Result;

/// Give up on the spinner after this long.
pub const LOADING_TIMEOUT: Duration = Duration::from_secs(10);
/// Load progress above this fraction counts as loaded.
pub const LOAD_PROGRESS_THRESHOLD: f64 = 0.95;
/// Settling time between a detected payment completion and the overlay close.
pub const OVERLAY_CLOSE_DELAY: Duration = Duration::from_secs(1);
/// Query parameter carrying the push token on app-initiated navigations.
pub const TOKEN_QUERY_PARAM: &str = "token";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouterTiming {
    pub loading_timeout: Duration,
    pub progress_threshold: f64,
    pub overlay_close_delay: Duration,
}

impl Default for RouterTiming {
    fn default() -> Self {
        Self {
            loading_timeout: LOADING_TIMEOUT,
            progress_threshold: LOAD_PROGRESS_THRESHOLD,
            overlay_close_delay: OVERLAY_CLOSE_DELAY,
        }
    }
}

pub type UrlObserver = Arc<dyn Fn(&str) + Send + Sync>;

struct RouterState {
    current_url: String,
    /// Last URL reported to observers
    announced_url: Option<String>,
    can_go_back: bool,
    phase: LoadPhase,
    /// Bumped on every navigation start
    generation: u64,
    /// URL of the navigation in flight (or the last one started)
    loading_url: Option<String>,
    load_started_at: Option<Instant>,
    /// URL whose load failed and awaits retry/cancel
    failed_url: Option<String>,
    push_token: Option<String>,
    close_generation: u64,
    pending_overlay_close: Option<u64>,
}

impl RouterState {
    fn new() -> Self {
        Self {
            current_url: String::new(),
            announced_url: None,
            can_go_back: false,
            phase: LoadPhase::Idle,
            generation: 0,
            loading_url: None,
            load_started_at: None,
            failed_url: None,
            push_token: None,
            close_generation: 0,
            pending_overlay_close: None,
        }
    }

    fn transition(&mut self, target: LoadPhase) -> bool {
        if !self.phase.can_transition_to(target) {
            tracing::debug!(from = %self.phase, to = %target, "Ignoring load phase transition");
            return false;
        }
        self.phase = target;
        true
    }
}

pub struct NavigationRouter {
    state: Arc<RwLock<RouterState>>,
    observers: Arc<RwLock<Vec<UrlObserver>>>,
    classifier: Arc<UrlClassifier>,
    handoff: Arc<HandoffExecutor>,
    overlay: OverlayManager,
    primary: Arc<dyn PrimarySurface>,
    prompt: Arc<dyn UserPrompt>,
    timing: RouterTiming,
}

impl NavigationRouter {
    pub fn new(host: RouterHost, classifier: UrlClassifier, platform: Platform, timing: RouterTiming) -> Self {
        let handoff = HandoffExecutor::new(host.opener.clone(), host.prompt.clone(), platform);

        Self {
            state: Arc::new(RwLock::new(RouterState::new())),
            observers: Arc::new(RwLock::new(Vec::new())),
            classifier: Arc::new(classifier),
            handoff: Arc::new(handoff),
            overlay: OverlayManager::new(host.overlay),
            primary: host.primary,
            prompt: host.prompt,
            timing,
        }
    }

    // === Snapshot ===

    pub fn snapshot(&self) -> NavigationState {
        let state = self.state.read();
        NavigationState {
            current_url: state.current_url.clone(),
            can_go_back: state.can_go_back,
            is_loading: state.phase.is_loading(),
            overlay: self.overlay.current(),
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.state.read().phase
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().phase.is_loading()
    }

    pub fn current_url(&self) -> String {
        self.state.read().current_url.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    pub fn overlay(&self) -> &OverlayManager {
        &self.overlay
    }

    pub fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    pub fn handoff(&self) -> &HandoffExecutor {
        &self.handoff
    }

    pub fn timing(&self) -> RouterTiming {
        self.timing
    }

    /// Register a callback fired whenever the announced URL changes.
    pub fn on_url_change(&self, observer: UrlObserver) {
        self.observers.write().push(observer);
    }

    // === Push token ===

    /// Store the token for navigations started from now on. URLs already
    /// loaded keep whatever token they were built with.
    pub fn set_push_token(&self, token: Option<String>) {
        self.state.write().push_token = token.filter(|t| !t.is_empty());
    }

    pub fn push_token(&self) -> Option<String> {
        self.state.read().push_token.clone()
    }

    // === Primary navigation ===

    /// App-initiated navigation (initial load, deep link). The push token is
    /// added once, here.
    pub fn navigate(&self, url: &str) -> Result<String> {
        let target = NavigationTarget::parse(url)?;
        let final_url = match self.push_token() {
            Some(token) if target.is_http() => append_token(&target.raw_url, &token),
            _ => target.raw_url.clone(),
        };

        tracing::info!(url = %final_url, "Navigating primary surface");
        self.primary.load_url(&final_url);
        self.start_navigation(&final_url);

        Ok(final_url)
    }

    /// A load began in the primary surface. Re-arms the loading timeout and
    /// cancels any pending payment overlay close.
    pub fn start_navigation(&self, url: &str) -> u64 {
        let generation = {
            let mut state = self.state.write();
            state.generation += 1;
            state.transition(LoadPhase::Loading);
            state.loading_url = Some(url.to_string());
            state.load_started_at = Some(Instant::now());
            state.failed_url = None;
            if state.pending_overlay_close.take().is_some() {
                tracing::info!("New navigation superseded pending overlay close");
            }
            state.generation
        };

        tracing::debug!(url = %url, generation, "Navigation started");
        self.arm_loading_timeout(generation);
        generation
    }

    pub fn on_navigation_state_changed(&self, url: &str, can_go_back: bool) {
        let announce = {
            let mut state = self.state.write();
            state.current_url = url.to_string();
            state.can_go_back = can_go_back;
            if state.announced_url.as_deref() != Some(url) {
                state.announced_url = Some(url.to_string());
                true
            } else {
                false
            }
        };

        if announce {
            tracing::debug!(url = %url, "Current URL changed");
            let observers = self.observers.read().clone();
            for observer in observers {
                observer(url);
            }
        }
    }

    pub fn on_load_progress(&self, fraction: f64) -> bool {
        if fraction > self.timing.progress_threshold {
            return self.mark_ready("progress");
        }
        false
    }

    pub fn on_page_loaded(&self) -> bool {
        self.mark_ready("page-loaded")
    }

    /// Loading timeout entry point. Only the timer of the current navigation
    /// can clear the spinner, and only once.
    pub fn on_loading_timeout(&self, generation: u64) -> bool {
        let mut state = self.state.write();
        if state.generation != generation {
            tracing::debug!(generation, current = state.generation, "Stale loading timeout");
            return false;
        }
        if !state.phase.is_loading() {
            return false;
        }

        state.transition(LoadPhase::Ready);
        tracing::warn!(generation, "Loading timeout - forcing loading indicator off");
        true
    }

    fn mark_ready(&self, reason: &'static str) -> bool {
        let mut state = self.state.write();
        if !state.phase.is_loading() {
            return false;
        }

        state.transition(LoadPhase::Ready);
        if let Some(started) = state.load_started_at.take() {
            tracing::info!(
                reason,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Page loaded"
            );
        }
        true
    }

    fn arm_loading_timeout(&self, generation: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(generation, "No async runtime, loading timeout not armed");
            return;
        };

        let router = self.clone();
        let deadline = tokio::time::Instant::now() + self.timing.loading_timeout;
        handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            router.on_loading_timeout(generation);
        });
    }

    // === Load errors ===

    pub fn on_load_error(&self, description: &str) -> NavigationError {
        let url = {
            let mut state = self.state.write();
            let url = state
                .loading_url
                .clone()
                .unwrap_or_else(|| state.current_url.clone());
            state.transition(LoadPhase::Ready);
            state.load_started_at = None;
            state.failed_url = Some(url.clone());
            url
        };

        tracing::warn!(url = %url, description = %description, "Page failed to load");
        self.prompt.load_failed(&url, description);

        NavigationError::LoadFailed {
            url,
            description: description.to_string(),
        }
    }

    /// User chose retry: load the failed URL again.
    pub fn retry_load(&self) -> Result<u64> {
        let url = self
            .state
            .write()
            .failed_url
            .take()
            .ok_or(NavigationError::NoPendingLoadError)?;

        tracing::info!(url = %url, "Retrying failed load");
        self.primary.load_url(&url);
        Ok(self.start_navigation(&url))
    }

    /// User chose cancel: whatever was rendered last stays visible.
    pub fn cancel_load_error(&self) -> Result<()> {
        self.state
            .write()
            .failed_url
            .take()
            .ok_or(NavigationError::NoPendingLoadError)?;
        tracing::info!("Load error dismissed");
        Ok(())
    }

    pub fn has_pending_load_error(&self) -> bool {
        self.state.read().failed_url.is_some()
    }

    // === Back ===

    /// Step back in the primary history. Never leaves the app; returns false
    /// when there is nowhere to go.
    pub fn go_back(&self) -> bool {
        if !self.state.read().can_go_back {
            return false;
        }
        self.primary.go_back();
        true
    }

    /// Hardware back: the overlay gets it first when one is shown.
    pub fn handle_back(&self) -> bool {
        if self.overlay.is_open() {
            self.overlay_go_back();
            return true;
        }
        self.go_back()
    }

    pub fn reload(&self) {
        self.primary.reload();
    }

    pub fn inject_script(&self, script: &str) {
        self.primary.inject_script(script);
    }

    /// Pre-content scripts for both surfaces. Set before the first load.
    pub fn install_pre_content_scripts(&self, primary: &str, overlay: &str) {
        self.primary.set_pre_content_script(primary);
        self.overlay.set_pre_content_script(overlay);
    }

    // === Routing ===

    /// Classify a request and carry out the decision. The returned decision
    /// is `LoadInPrimary` when the requesting surface should load the URL
    /// itself.
    pub fn route(&self, url: &str, origin: RequestOrigin) -> RoutingDecision {
        let target = match NavigationTarget::parse(url) {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Rejected navigation request");
                return RoutingDecision::Reject;
            }
        };

        let decision = self.classifier.classify_target(&target, origin);
        match &decision {
            RoutingDecision::LoadInPrimary => {}
            RoutingDecision::LoadInOverlay => {
                self.open_overlay(&target.raw_url);
            }
            RoutingDecision::HandOffExternal {
                target_app,
                fallback_url,
            } => {
                self.handoff
                    .execute(&target, target_app.as_deref(), fallback_url.as_deref());
            }
            RoutingDecision::Reject => {
                tracing::warn!(url = %url, "Navigation rejected");
            }
        }

        decision
    }

    /// Should-start-load hook for either surface.
    pub fn should_start_load(&self, url: &str, origin: RequestOrigin) -> bool {
        self.route(url, origin) == RoutingDecision::LoadInPrimary
    }

    /// A new-window request from the page.
    pub fn on_open_window(&self, url: &str) -> RoutingDecision {
        tracing::info!(url = %url, "Popup window request");
        self.route(url, RequestOrigin::Popup)
    }

    // === Overlay ===

    pub fn open_overlay(&self, url: &str) -> OverlayState {
        self.cancel_overlay_close();
        self.overlay.open(url)
    }

    /// Close the overlay and reload the primary surface so it reflects
    /// server-side changes.
    pub fn close_overlay(&self) -> bool {
        self.cancel_overlay_close();
        if self.overlay.close().is_none() {
            return false;
        }
        self.primary.reload();
        true
    }

    /// Close the overlay without reloading the primary surface.
    pub fn dismiss_overlay(&self) -> bool {
        self.cancel_overlay_close();
        self.overlay.close().is_some()
    }

    pub fn overlay_go_back(&self) -> OverlayBack {
        let result = self.overlay.go_back();
        if let OverlayBack::Closed(_) = &result {
            self.cancel_overlay_close();
            self.primary.reload();
        }
        result
    }

    /// Overlay navigation callback. A success-like URL schedules the delayed
    /// close; returns true when it did.
    pub fn on_overlay_navigation_state_changed(
        &self,
        url: &str,
        can_go_back: bool,
        title: Option<&str>,
    ) -> bool {
        if self.overlay.on_navigation_state_changed(url, can_go_back, title) {
            tracing::info!(url = %url, "Payment completion URL detected in overlay");
            return self.schedule_overlay_close().is_some();
        }
        false
    }

    /// Payment flow finished: close the overlay after the settling delay,
    /// then reload the primary surface. A close already pending is kept.
    pub fn schedule_overlay_close(&self) -> Option<u64> {
        if !self.overlay.is_open() {
            tracing::debug!("Overlay close requested without an overlay");
            return None;
        }

        let generation = {
            let mut state = self.state.write();
            if state.pending_overlay_close.is_some() {
                return None;
            }
            state.close_generation += 1;
            state.pending_overlay_close = Some(state.close_generation);
            state.close_generation
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let router = self.clone();
                let deadline = tokio::time::Instant::now() + self.timing.overlay_close_delay;
                handle.spawn(async move {
                    tokio::time::sleep_until(deadline).await;
                    router.fire_overlay_close(generation);
                });
            }
            Err(_) => {
                tracing::debug!("No async runtime, closing overlay immediately");
                self.fire_overlay_close(generation);
            }
        }

        Some(generation)
    }

    pub fn has_pending_overlay_close(&self) -> bool {
        self.state.read().pending_overlay_close.is_some()
    }

    /// Delayed close entry point; ignored when superseded.
    pub fn fire_overlay_close(&self, generation: u64) -> bool {
        {
            let mut state = self.state.write();
            if state.pending_overlay_close != Some(generation) {
                tracing::debug!(generation, "Stale overlay close");
                return false;
            }
            state.pending_overlay_close = None;
        }

        self.overlay.close();
        self.primary.reload();
        true
    }

    fn cancel_overlay_close(&self) {
        self.state.write().pending_overlay_close = None;
    }
}

impl Clone for NavigationRouter {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            observers: Arc::clone(&self.observers),
            classifier: Arc::clone(&self.classifier),
            handoff: Arc::clone(&self.handoff),
            overlay: self.overlay.clone(),
            primary: Arc::clone(&self.primary),
            prompt: Arc::clone(&self.prompt),
            timing: self.timing,
        }
    }
}

/// Set the token query parameter, replacing any previous value.
pub fn append_token(url: &str, token: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != TOKEN_QUERY_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        for (k, v) in &pairs {
            query.append_pair(k, v);
        }
        query.append_pair(TOKEN_QUERY_PARAM, token);
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandoffError;
    use crate::surface::{ExternalOpener, OverlaySurface};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, call: String) {
            self.calls.lock().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    struct FakePrimary(Arc<Recorder>);
    struct FakeOverlay(Arc<Recorder>);
    struct FakeOpener(Arc<Recorder>);
    struct FakePrompt(Arc<Recorder>);

    impl PrimarySurface for FakePrimary {
        fn load_url(&self, url: &str) {
            self.0.push(format!("primary.load {}", url));
        }
        fn reload(&self) {
            self.0.push("primary.reload".to_string());
        }
        fn go_back(&self) {
            self.0.push("primary.back".to_string());
        }
        fn inject_script(&self, _script: &str) {
            self.0.push("primary.inject".to_string());
        }
        fn set_pre_content_script(&self, _script: &str) {
            self.0.push("primary.pre_content".to_string());
        }
    }

    impl OverlaySurface for FakeOverlay {
        fn present(&self, url: &str) {
            self.0.push(format!("overlay.present {}", url));
        }
        fn go_back(&self) {
            self.0.push("overlay.back".to_string());
        }
        fn dismiss(&self) {
            self.0.push("overlay.dismiss".to_string());
        }
        fn inject_script(&self, _script: &str) {
            self.0.push("overlay.inject".to_string());
        }
        fn set_pre_content_script(&self, _script: &str) {
            self.0.push("overlay.pre_content".to_string());
        }
    }

    impl ExternalOpener for FakeOpener {
        fn can_open(&self, url: &str) -> bool {
            url.starts_with("https://")
        }
        fn open(&self, url: &str) -> std::result::Result<(), HandoffError> {
            if self.can_open(url) {
                self.0.push(format!("open {}", url));
                Ok(())
            } else {
                Err(HandoffError::Unavailable(url.to_string()))
            }
        }
    }

    impl UserPrompt for FakePrompt {
        fn load_failed(&self, url: &str, _description: &str) {
            self.0.push(format!("prompt.load_failed {}", url));
        }
        fn app_not_installed(&self, _app_name: Option<&str>, _install_url: Option<&str>) {
            self.0.push("prompt.app_not_installed".to_string());
        }
    }

    fn router() -> (NavigationRouter, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let host = RouterHost {
            primary: Arc::new(FakePrimary(recorder.clone())),
            overlay: Arc::new(FakeOverlay(recorder.clone())),
            opener: Arc::new(FakeOpener(recorder.clone())),
            prompt: Arc::new(FakePrompt(recorder.clone())),
        };
        let classifier = UrlClassifier::new().with_store_host("market.example");
        (
            NavigationRouter::new(host, classifier, Platform::Android, RouterTiming::default()),
            recorder,
        )
    }

    #[test]
    fn test_initial_state() {
        let (router, _) = router();
        let snapshot = router.snapshot();
        assert_eq!(router.phase(), LoadPhase::Idle);
        assert!(!snapshot.is_loading);
        assert!(snapshot.current_url.is_empty());
        assert!(snapshot.overlay.is_none());
    }

    #[test]
    fn test_page_loaded_transitions_to_ready() {
        let (router, _) = router();
        router.navigate("https://shop.example").unwrap();
        assert!(router.is_loading());

        assert!(router.on_page_loaded());
        assert_eq!(router.phase(), LoadPhase::Ready);
        // Second signal is a no-op
        assert!(!router.on_page_loaded());
    }

    #[test]
    fn test_progress_threshold() {
        let (router, _) = router();
        router.start_navigation("https://shop.example");

        assert!(!router.on_load_progress(0.5));
        assert!(!router.on_load_progress(0.95));
        assert!(router.is_loading());
        assert!(router.on_load_progress(0.96));
        assert!(!router.is_loading());
    }

    #[test]
    fn test_timeout_fires_once_for_current_generation() {
        let (router, _) = router();
        let generation = router.start_navigation("https://shop.example");

        assert!(router.on_loading_timeout(generation));
        assert!(!router.is_loading());
        assert!(!router.on_loading_timeout(generation));
    }

    #[test]
    fn test_stale_timeout_cannot_touch_new_navigation() {
        let (router, _) = router();
        let first = router.start_navigation("https://shop.example/a");
        let second = router.start_navigation("https://shop.example/b");
        assert_ne!(first, second);

        assert!(!router.on_loading_timeout(first));
        assert!(router.is_loading());
    }

    #[test]
    fn test_timeout_after_page_loaded_is_noop() {
        let (router, _) = router();
        let generation = router.start_navigation("https://shop.example");
        router.on_page_loaded();
        assert!(!router.on_loading_timeout(generation));
        assert_eq!(router.phase(), LoadPhase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_timeout_liveness() {
        let (router, _) = router();
        router.navigate("https://shop.example").unwrap();

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(router.is_loading());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!router.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_timer_does_not_end_later_load() {
        let (router, _) = router();
        router.navigate("https://shop.example/a").unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        router.navigate("https://shop.example/b").unwrap();

        // First timer fires at t=10 and must be ignored
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(router.is_loading());

        // Second timer fires at t=15
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!router.is_loading());
    }

    #[test]
    fn test_url_change_notifies_once_per_distinct_url() {
        let (router, _) = router();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        router.on_url_change(Arc::new(move |url: &str| sink.lock().push(url.to_string())));

        router.on_navigation_state_changed("https://shop.example/a", false);
        router.on_navigation_state_changed("https://shop.example/a", true);
        router.on_navigation_state_changed("https://shop.example/b", true);

        assert_eq!(
            *seen.lock(),
            vec!["https://shop.example/a".to_string(), "https://shop.example/b".to_string()]
        );
        let snapshot = router.snapshot();
        assert_eq!(snapshot.current_url, "https://shop.example/b");
        assert!(snapshot.can_go_back);
    }

    #[test]
    fn test_go_back_only_with_history() {
        let (router, recorder) = router();
        assert!(!router.go_back());
        assert_eq!(recorder.count("primary.back"), 0);

        router.on_navigation_state_changed("https://shop.example/b", true);
        assert!(router.go_back());
        assert_eq!(recorder.count("primary.back"), 1);
    }

    #[test]
    fn test_token_is_appended_once_per_navigation() {
        let (router, recorder) = router();
        router.set_push_token(Some("t1".to_string()));

        let url = router.navigate("https://shop.example/?token=old&a=1").unwrap();
        assert_eq!(url, "https://shop.example/?a=1&token=t1");
        router.on_navigation_state_changed(&url, false);

        // Refresh does not rewrite the loaded URL
        router.set_push_token(Some("t2".to_string()));
        assert_eq!(router.current_url(), url);
        assert_eq!(recorder.count("primary.load"), 1);

        let next = router.navigate("https://shop.example/next").unwrap();
        assert_eq!(next, "https://shop.example/next?token=t2");
    }

    #[test]
    fn test_token_not_added_to_custom_scheme() {
        let (router, _) = router();
        router.set_push_token(Some("t1".to_string()));
        assert_eq!(router.navigate("app://home").unwrap(), "app://home");
    }

    #[test]
    fn test_invalid_navigation() {
        let (router, _) = router();
        assert!(matches!(
            router.navigate("not a url"),
            Err(NavigationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_load_error_retry() {
        let (router, recorder) = router();
        router.navigate("https://shop.example/a").unwrap();

        let err = router.on_load_error("net::ERR_INTERNET_DISCONNECTED");
        assert!(matches!(err, NavigationError::LoadFailed { .. }));
        assert!(!router.is_loading());
        assert!(router.has_pending_load_error());
        assert_eq!(recorder.count("prompt.load_failed https://shop.example/a"), 1);

        router.retry_load().unwrap();
        assert!(router.is_loading());
        assert_eq!(recorder.count("primary.load https://shop.example/a"), 2);
        assert!(matches!(router.retry_load(), Err(NavigationError::NoPendingLoadError)));
    }

    #[test]
    fn test_load_error_cancel_keeps_content() {
        let (router, recorder) = router();
        router.navigate("https://shop.example/a").unwrap();
        router.on_navigation_state_changed("https://shop.example/a", false);
        router.on_page_loaded();

        router.navigate("https://shop.example/b").unwrap();
        router.on_load_error("timeout");
        router.cancel_load_error().unwrap();

        assert_eq!(router.current_url(), "https://shop.example/a");
        assert!(!router.is_loading());
        assert_eq!(recorder.count("primary.load"), 2);
        assert!(router.cancel_load_error().is_err());
    }

    #[test]
    fn test_route_decisions_and_effects() {
        let (router, recorder) = router();

        assert!(router.should_start_load("https://shop.example/item", RequestOrigin::Primary));

        let decision = router.route("https://market.example/app", RequestOrigin::Primary);
        assert_eq!(
            decision,
            RoutingDecision::HandOffExternal {
                target_app: None,
                fallback_url: None
            }
        );
        assert_eq!(recorder.count("open https://market.example/app"), 1);

        assert!(!router.should_start_load("kakaopay://x", RequestOrigin::Primary));
        assert_eq!(recorder.count("prompt.app_not_installed"), 1);

        assert_eq!(
            router.on_open_window("https://pg.example/pay"),
            RoutingDecision::LoadInOverlay
        );
        assert!(router.overlay().is_open());
        assert_eq!(recorder.count("overlay.present https://pg.example/pay"), 1);
    }

    #[test]
    fn test_pre_content_scripts_installed_before_content() {
        let (router, recorder) = router();
        router.install_pre_content_scripts("/* primary */", "/* overlay */");
        router.navigate("https://shop.example").unwrap();
        router.on_open_window("https://pg.example/pay");

        assert_eq!(
            recorder.calls(),
            vec![
                "primary.pre_content".to_string(),
                "primary.load https://shop.example".to_string(),
                "overlay.pre_content".to_string(),
                "overlay.present https://pg.example/pay".to_string(),
            ]
        );
    }

    #[test]
    fn test_intent_fallback_delivered() {
        let (router, recorder) = router();
        router.route(
            "intent://pay#Intent;package=com.bank.app;S.browser_fallback_url=https%3A%2F%2Ffallback.example;end",
            RequestOrigin::Primary,
        );
        assert_eq!(recorder.count("open https://fallback.example"), 1);
    }

    #[test]
    fn test_close_overlay_reloads_primary_but_dismiss_does_not() {
        let (router, recorder) = router();
        router.open_overlay("https://pg.example/pay");
        assert!(router.close_overlay());
        assert_eq!(recorder.count("primary.reload"), 1);
        assert!(!router.close_overlay());

        router.open_overlay("https://pg.example/pay");
        assert!(router.dismiss_overlay());
        assert_eq!(recorder.count("primary.reload"), 1);
    }

    #[test]
    fn test_handle_back_prefers_overlay() {
        let (router, recorder) = router();
        router.on_navigation_state_changed("https://shop.example/b", true);
        router.open_overlay("https://pg.example/pay");

        assert!(router.handle_back());
        assert!(!router.overlay().is_open());
        assert_eq!(recorder.count("primary.back"), 0);
        assert_eq!(recorder.count("primary.reload"), 1);

        assert!(router.handle_back());
        assert_eq!(recorder.count("primary.back"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_url_closes_overlay_after_delay() {
        let (router, recorder) = router();
        router.open_overlay("https://pg.example/pay");

        assert!(router.on_overlay_navigation_state_changed(
            "https://shop.example/checkout?success=1",
            true,
            None
        ));
        // A second success-like URL keeps the close already scheduled
        assert!(!router.on_overlay_navigation_state_changed(
            "https://shop.example/callback",
            true,
            None
        ));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(router.overlay().is_open());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!router.overlay().is_open());
        assert_eq!(recorder.count("primary.reload"), 1);
        assert!(!router.has_pending_overlay_close());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_navigation_supersedes_pending_close() {
        let (router, recorder) = router();
        router.open_overlay("https://pg.example/pay");
        router.schedule_overlay_close().unwrap();

        router.start_navigation("https://shop.example/other");
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(router.overlay().is_open());
        assert_eq!(recorder.count("primary.reload"), 0);
    }

    #[test]
    fn test_stale_overlay_close_is_ignored() {
        let (router, _) = router();
        router.open_overlay("https://pg.example/pay");
        // Without a runtime the close happens immediately
        let generation = router.schedule_overlay_close().unwrap();
        assert!(!router.overlay().is_open());
        assert!(!router.fire_overlay_close(generation));
    }

    #[test]
    fn test_schedule_without_overlay() {
        let (router, recorder) = router();
        assert!(router.schedule_overlay_close().is_none());
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn test_append_token() {
        assert_eq!(
            append_token("https://vpvmall.com", "abc"),
            "https://vpvmall.com/?token=abc"
        );
        assert_eq!(append_token("garbage", "abc"), "garbage");
    }
}
