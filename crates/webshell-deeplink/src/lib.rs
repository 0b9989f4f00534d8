//! Webshell Deep Links
//!
//! Incoming links (OS "opened via link" events, notification taps) are
//! validated, recorded, fanned out to handlers and handed to the navigation
//! side once it exists. A link that arrives earlier waits in a single
//! durable slot.

mod error;
mod link;
mod queue;

pub use error::DeepLinkError;
pub use link::{
    build_webview_url, is_valid_url, ParsedLink, DEEPLINK_PATH_PARAM, SOURCE_DEEPLINK, SOURCE_PARAM,
};
pub use queue::{
    DeepLinkQueue, EnqueueOutcome, HandlerId, LastDeepLink, LinkConsumer, LinkHandler,
    PendingDeepLink, DUPLICATE_WINDOW,
};

pub type Result<T> = std::result::Result<T, DeepLinkError>;
