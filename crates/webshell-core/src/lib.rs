//! Webshell Core
//!
//! Central coordination for the shell: one embedded page, native push and
//! deep links, external payment apps. The host adapter implements the
//! capability traits and forwards its events to [`Shell`].

mod config;
mod error;
mod host;
mod shell;

pub use config::{Config, PushConfig, DEFAULT_BASE_URL};
pub use error::CoreError;
pub use host::{DisplayControl, NotificationPresenter, ShellHost};
pub use shell::{link_target, Shell};

// Re-export core components
pub use webshell_bridge::{scripts, BridgeError, BridgeMessage, HostAction, MessageBridge, MessageSource, Orientation};
pub use webshell_deeplink::{DeepLinkError, DeepLinkQueue, EnqueueOutcome, LastDeepLink, ParsedLink};
pub use webshell_navigation::{
    ExternalOpener, HandoffError, LoadPhase, NavigationError, NavigationRouter, NavigationState,
    OverlayState, OverlaySurface, Platform, PrimarySurface, RequestOrigin, RouterHost, RoutingDecision,
    UserPrompt,
};
pub use webshell_push::{
    NotificationAlert, NotificationEvent, NotificationOutcome, NotificationPayload, PermissionStatus,
    PushError, PushPlatform, PushToken,
};
pub use webshell_storage::{Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
