//! Message dispatch
//!
//! Each message maps to exactly one host action. Malformed payloads are
//! logged and turned into [`HostAction::Ignore`]; nothing here fails.

use serde::{Deserialize, Serialize};

use webshell_push::TokenHandle;

use crate::message::{BridgeMessage, Orientation};
use crate::scripts;

/// Which surface posted the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    Primary,
    Overlay,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    LockOrientation(Orientation),
    /// Run `script` in the surface the message came from
    InjectScript { target: MessageSource, script: String },
    /// Clear the loading timer and the spinner
    MarkPageLoaded,
    /// Close the overlay after the settling delay, then reload the primary
    ScheduleOverlayClose,
    /// Close the overlay now, no reload
    DismissOverlay,
    GoBack(MessageSource),
    OpenOverlay(String),
    Ignore,
}

pub struct MessageBridge {
    token: TokenHandle,
}

impl MessageBridge {
    pub fn new(token: TokenHandle) -> Self {
        Self { token }
    }

    /// Entry point for the single page → host channel.
    pub fn handle_raw(&self, raw: &str, source: MessageSource) -> HostAction {
        match BridgeMessage::parse(raw) {
            Ok(message) => self.dispatch(&message, source),
            Err(e) => {
                tracing::warn!(source = ?source, error = %e, "Dropping bridge message");
                HostAction::Ignore
            }
        }
    }

    pub fn dispatch(&self, message: &BridgeMessage, source: MessageSource) -> HostAction {
        tracing::debug!(source = ?source, message_type = %message.tag(), "Bridge message");

        match message {
            BridgeMessage::OrientationChange(orientation) => HostAction::LockOrientation(*orientation),
            BridgeMessage::TokenRequest => HostAction::InjectScript {
                target: source,
                script: self.token_response(),
            },
            BridgeMessage::PageLoaded => match source {
                MessageSource::Primary => HostAction::MarkPageLoaded,
                MessageSource::Overlay => HostAction::Ignore,
            },
            BridgeMessage::PaymentComplete => HostAction::ScheduleOverlayClose,
            BridgeMessage::CloseOverlay => HostAction::DismissOverlay,
            BridgeMessage::OpenerMessage { data, origin } => {
                tracing::info!(data = %data, origin = ?origin, "Opener message");
                HostAction::Ignore
            }
            BridgeMessage::GoBack => HostAction::GoBack(source),
            BridgeMessage::OverlayRequest { url } => HostAction::OpenOverlay(url.clone()),
            BridgeMessage::Unknown(tag) => {
                tracing::debug!(message_type = %tag, "Unhandled bridge message type");
                HostAction::Ignore
            }
        }
    }

    /// Token response for the current token, or the empty sentinel.
    pub fn token_response(&self) -> String {
        scripts::token_response_script(self.token.value().as_deref())
    }

    pub fn primary_page_script(&self) -> String {
        scripts::primary_page_script(self.token.value().as_deref())
    }
}

impl Clone for MessageBridge {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
        }
    }
}
