//! Webshell Message Bridge
//!
//! Host → page: injected scripts. Page → host: one JSON message channel.
//! Every page message is validated into a [`BridgeMessage`] and mapped to a
//! single [`HostAction`] the shell carries out.

mod dispatch;
mod error;
mod message;
pub mod scripts;

pub use dispatch::{HostAction, MessageBridge, MessageSource};
pub use error::BridgeError;
pub use message::{BridgeMessage, Orientation, OutboundMessage};

pub type Result<T> = std::result::Result<T, BridgeError>;
