//! Well-known keys in the shared key-value store

/// Deep link that arrived before the router was ready (single slot).
pub const PENDING_DEEP_LINK: &str = "pending_deep_link";
/// Cached push token, JSON encoded.
pub const PUSH_TOKEN: &str = "push_token";
/// Last URL announced by the primary surface.
pub const LAST_URL: &str = "last_url";
/// Base URL override written by the packaging layer.
pub const BASE_URL: &str = "base_url";
pub const LAST_DEEPLINK_URL: &str = "last_deeplink_url";
pub const LAST_DEEPLINK_DATA: &str = "last_deeplink_data";
pub const LAST_NOTIFICATION_DATA: &str = "last_notification_data";
