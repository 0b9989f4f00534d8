//! Webshell Push
//!
//! Push token acquisition, caching and refresh, plus notification handling.
//! The platform messaging service is reached only through [`PushPlatform`].

mod error;
mod lifecycle;
mod notification;
mod platform;
mod token;

pub use error::PushError;
pub use lifecycle::{PushTokenLifecycle, RefreshListener};
pub use notification::{
    NotificationAlert, NotificationEvent, NotificationOutcome, NotificationPayload,
    NotificationProcessor, NotificationRecord, DEFAULT_ALERT_TITLE, LINK_DATA_KEY,
};
pub use platform::{PermissionStatus, PushPlatform};
pub use token::{PushToken, TokenHandle};

pub type Result<T> = std::result::Result<T, PushError>;
