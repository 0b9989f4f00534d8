//! Webshell Navigation
//!
//! Every outbound navigation request from the embedded page is classified
//! before it loads:
//! 1. External payment/app scheme (or `market://`) → hand off to another app
//! 2. App-store host → hand off
//! 3. Anything else → load in place, or in the overlay when a popup asked
//!
//! The router owns the single current URL and the loading indicator. The
//! overlay is a separate browsing context with its own history.

mod classifier;
mod error;
mod handoff;
mod overlay;
mod router;
mod state;
mod surface;
mod target;

pub use classifier::{
    known_app_for_package, known_app_for_scheme, IntentSpec, KnownApp, RequestOrigin,
    RoutingDecision, UrlClassifier, KNOWN_APPS, MARKET_SCHEME, PAYMENT_SCHEMES, STORE_LOCATIONS,
};
pub use error::{HandoffError, NavigationError};
pub use handoff::{market_url, HandoffExecutor, HandoffOutcome, Platform};
pub use overlay::{is_completion_url, OverlayBack, OverlayManager, SUCCESS_PATTERNS};
pub use router::{
    append_token, NavigationRouter, RouterTiming, UrlObserver, LOADING_TIMEOUT,
    LOAD_PROGRESS_THRESHOLD, OVERLAY_CLOSE_DELAY, TOKEN_QUERY_PARAM,
};
pub use state::{LoadPhase, NavigationState, OverlayState};
pub use surface::{ExternalOpener, OverlaySurface, PrimarySurface, RouterHost, UserPrompt};
pub use target::{scheme_prefix, NavigationTarget};

pub type Result<T> = std::result::Result<T, NavigationError>;
