//! Bridge messages
//!
//! Page → host messages arrive as JSON objects with a `type` tag. They are
//! validated once, here, into [`BridgeMessage`]; an unrecognised tag becomes
//! [`BridgeMessage::Unknown`] instead of being dropped silently.
//!
//! Host → page messages ([`OutboundMessage`]) are serialized with the same
//! tag convention and delivered through injected scripts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BridgeError;
use crate::Result;

pub const ORIENTATION_CHANGE: &str = "ORIENTATION_CHANGE";
pub const TOKEN_REQUEST: &str = "FCM_TOKEN_REQUEST";
pub const PAGE_LOADED: &str = "PAGE_LOADED";
pub const PAYMENT_COMPLETE: &str = "PAYMENT_COMPLETE";
pub const CLOSE_WINDOW: &str = "CLOSE_WINDOW";
pub const OPENER_MESSAGE: &str = "OPENER_MESSAGE";
pub const GO_BACK: &str = "GO_BACK";
pub const OPEN_WINDOW: &str = "OPEN_WINDOW";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Anything other than `landscape` locks to portrait.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("landscape") => Orientation::Landscape,
            _ => Orientation::Portrait,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    OrientationChange(Orientation),
    TokenRequest,
    PageLoaded,
    PaymentComplete,
    CloseOverlay,
    OpenerMessage { data: Value, origin: Option<String> },
    GoBack,
    /// New-window request reported by the page adapter
    OverlayRequest { url: String },
    Unknown(String),
}

impl BridgeMessage {
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| BridgeError::InvalidMessage("payload is not an object".to_string()))?;
        let tag = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| BridgeError::InvalidMessage("missing type tag".to_string()))?;

        let message = match tag {
            ORIENTATION_CHANGE => BridgeMessage::OrientationChange(Orientation::from_wire(
                object.get("orientation").and_then(Value::as_str),
            )),
            TOKEN_REQUEST => BridgeMessage::TokenRequest,
            PAGE_LOADED => BridgeMessage::PageLoaded,
            PAYMENT_COMPLETE => BridgeMessage::PaymentComplete,
            CLOSE_WINDOW => BridgeMessage::CloseOverlay,
            OPENER_MESSAGE => BridgeMessage::OpenerMessage {
                data: object.get("data").cloned().unwrap_or(Value::Null),
                origin: object
                    .get("origin")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            GO_BACK => BridgeMessage::GoBack,
            OPEN_WINDOW => {
                let url = object
                    .get("url")
                    .and_then(Value::as_str)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| BridgeError::InvalidMessage("OPEN_WINDOW without url".to_string()))?;
                BridgeMessage::OverlayRequest {
                    url: url.to_string(),
                }
            }
            other => BridgeMessage::Unknown(other.to_string()),
        };

        Ok(message)
    }

    pub fn tag(&self) -> &str {
        match self {
            BridgeMessage::OrientationChange(_) => ORIENTATION_CHANGE,
            BridgeMessage::TokenRequest => TOKEN_REQUEST,
            BridgeMessage::PageLoaded => PAGE_LOADED,
            BridgeMessage::PaymentComplete => PAYMENT_COMPLETE,
            BridgeMessage::CloseOverlay => CLOSE_WINDOW,
            BridgeMessage::OpenerMessage { .. } => OPENER_MESSAGE,
            BridgeMessage::GoBack => GO_BACK,
            BridgeMessage::OverlayRequest { .. } => OPEN_WINDOW,
            BridgeMessage::Unknown(tag) => tag,
        }
    }

    /// Wire form, as the page would send it.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(self.tag().to_string()));

        match self {
            BridgeMessage::OrientationChange(orientation) => {
                object.insert(
                    "orientation".to_string(),
                    Value::String(orientation.as_str().to_string()),
                );
            }
            BridgeMessage::OpenerMessage { data, origin } => {
                object.insert("data".to_string(), data.clone());
                if let Some(origin) = origin {
                    object.insert("origin".to_string(), Value::String(origin.clone()));
                }
            }
            BridgeMessage::OverlayRequest { url } => {
                object.insert("url".to_string(), Value::String(url.clone()));
            }
            _ => {}
        }

        Value::Object(object)
    }
}

/// Host → page messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    /// Empty `token` when running without one
    #[serde(rename = "FCM_TOKEN_RESPONSE")]
    TokenResponse { token: String },

    #[serde(rename = "NOTIFICATION_RECEIVED")]
    NotificationReceived { data: Value },

    #[serde(rename = "DEEP_LINK_RECEIVED")]
    DeepLinkReceived { url: String, data: Value },
}
