//! URL classification
//!
//! Every outbound navigation is matched against three ordered rule sets:
//! 1. External payment/app schemes and the market scheme → hand off
//! 2. App-store hosts over http(s) → hand off, no fallback
//! 3. Everything else → load in the requesting surface, or in the overlay
//!    when the request came from a popup
//!
//! The first matching rule wins. Scheme checks are case-insensitive.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::target::{urlencoding, NavigationTarget};

/// Schemes that belong to payment, card and identity apps.
pub const PAYMENT_SCHEMES: &[&str] = &[
    // Android intents
    "intent",
    // Toss
    "supertoss",
    "toss",
    // Wallets
    "kakaopay",
    "payco",
    "chaipay",
    "naverpay",
    "samsungpay",
    "kbankpay",
    "ispmobile",
    // Card app-card schemes
    "hdcardappcardansimclick",
    "shinhan-sr-ansimclick",
    "kb-acp",
    "mpocket.online.ansimclick",
    "lottemembers",
    "lotteappcard",
    "cloudpay",
    "nhappcardansimclick",
    "citispay",
    "citicardappkr",
    "wooripay",
    "shinsegaeeasypayment",
    "lpayapp",
    "hanawalletmembers",
    // Identity verification
    "tauthlink",
    "ktauthexternalcall",
    "upluscorporation",
];

/// Platform market scheme.
pub const MARKET_SCHEME: &str = "market";

/// App-store locations as `(host, path prefix)`.
pub const STORE_LOCATIONS: &[(&str, &str)] = &[
    ("play.google.com", "/store"),
    ("apps.apple.com", ""),
    ("itunes.apple.com", ""),
];

/// Apps the shell knows how to offer for installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownApp {
    pub name: &'static str,
    pub schemes: &'static [&'static str],
    pub package: &'static str,
    pub app_store_url: &'static str,
}

pub const KNOWN_APPS: &[KnownApp] = &[KnownApp {
    name: "Toss",
    schemes: &["supertoss", "toss"],
    package: "viva.republica.toss",
    app_store_url: "https://apps.apple.com/kr/app/id839333328",
}];

pub fn known_app_for_scheme(scheme: &str) -> Option<&'static KnownApp> {
    let scheme = scheme.to_lowercase();
    KNOWN_APPS
        .iter()
        .find(|app| app.schemes.iter().any(|s| *s == scheme))
}

pub fn known_app_for_package(package: &str) -> Option<&'static KnownApp> {
    KNOWN_APPS.iter().find(|app| app.package == package)
}

/// Where a navigation request should go. Exactly one per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingDecision {
    /// Keep the load in the surface that requested it
    LoadInPrimary,
    /// Open in the secondary overlay surface
    LoadInOverlay,
    /// Delegate to another application
    HandOffExternal {
        target_app: Option<String>,
        fallback_url: Option<String>,
    },
    /// Not loadable anywhere
    Reject,
}

impl RoutingDecision {
    pub fn is_external(&self) -> bool {
        matches!(self, RoutingDecision::HandOffExternal { .. })
    }
}

/// Which surface asked for the navigation.
///
/// `Popup` is set out-of-band by the surface adapter when the request came
/// from a new-window/popup call rather than a plain link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOrigin {
    Primary,
    Overlay,
    Popup,
}

/// Package and fallback embedded in an Android intent URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentSpec {
    pub package: Option<String>,
    pub fallback_url: Option<String>,
}

impl IntentSpec {
    pub fn parse(raw: &str) -> Self {
        Self {
            package: extract_intent_param(raw, "package="),
            fallback_url: extract_intent_param(raw, "S.browser_fallback_url=")
                .map(|v| urlencoding::decode(&v)),
        }
    }
}

fn extract_intent_param(raw: &str, key: &str) -> Option<String> {
    let start = raw.find(key)? + key.len();
    let value: String = raw[start..]
        .chars()
        .take_while(|c| *c != ';' && *c != '#')
        .collect();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub struct UrlClassifier {
    payment_schemes: HashSet<String>,
    store_locations: Vec<(String, String)>,
}

impl UrlClassifier {
    pub fn new() -> Self {
        Self {
            payment_schemes: PAYMENT_SCHEMES.iter().map(|s| s.to_string()).collect(),
            store_locations: STORE_LOCATIONS
                .iter()
                .map(|(host, path)| (host.to_string(), path.to_string()))
                .collect(),
        }
    }

    pub fn with_payment_scheme(mut self, scheme: &str) -> Self {
        let scheme = scheme.trim_end_matches("://").trim_end_matches(':');
        self.payment_schemes.insert(scheme.to_lowercase());
        self
    }

    pub fn with_store_host(mut self, host: &str) -> Self {
        self.store_locations
            .push((host.to_lowercase(), String::new()));
        self
    }

    pub fn is_external_scheme(&self, scheme: &str) -> bool {
        let scheme = scheme.to_lowercase();
        scheme == MARKET_SCHEME || self.payment_schemes.contains(&scheme)
    }

    pub fn is_store_location(&self, target: &NavigationTarget) -> bool {
        target.is_http()
            && self
                .store_locations
                .iter()
                .any(|(host, path)| target.host_matches(host) && target.path.starts_with(path.as_str()))
    }

    pub fn classify(&self, url: &str, origin: RequestOrigin) -> RoutingDecision {
        match NavigationTarget::parse(url) {
            Ok(target) => self.classify_target(&target, origin),
            Err(_) => {
                tracing::warn!(url = %url, "Rejecting unparseable navigation target");
                RoutingDecision::Reject
            }
        }
    }

    pub fn classify_target(&self, target: &NavigationTarget, origin: RequestOrigin) -> RoutingDecision {
        // Rule 1: scheme prefix
        if self.is_external_scheme(&target.scheme) {
            return self.external_decision(target);
        }

        // Rule 2: store domains
        if self.is_store_location(target) {
            return RoutingDecision::HandOffExternal {
                target_app: None,
                fallback_url: None,
            };
        }

        // Rule 3: default
        match origin {
            RequestOrigin::Popup => RoutingDecision::LoadInOverlay,
            RequestOrigin::Primary | RequestOrigin::Overlay => RoutingDecision::LoadInPrimary,
        }
    }

    fn external_decision(&self, target: &NavigationTarget) -> RoutingDecision {
        if target.scheme == "intent" {
            let spec = IntentSpec::parse(&target.raw_url);
            return RoutingDecision::HandOffExternal {
                target_app: spec.package,
                fallback_url: spec.fallback_url,
            };
        }

        if target.scheme == MARKET_SCHEME {
            return RoutingDecision::HandOffExternal {
                target_app: target.query.get("id").cloned(),
                fallback_url: None,
            };
        }

        RoutingDecision::HandOffExternal {
            target_app: known_app_for_scheme(&target.scheme).map(|app| app.package.to_string()),
            fallback_url: None,
        }
    }
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new()
    }
}
