//! JSON-lines event scripts
//!
//! One event per line, tagged by `event`:
//!
//! ```text
//! {"event":"nav_state","url":"https://shop.example/cart","can_go_back":true}
//! {"event":"message","payload":{"type":"PAGE_LOADED"}}
//! {"event":"wait","ms":1500}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use webshell_core::{MessageSource, NotificationEvent, NotificationPayload, RequestOrigin, Shell};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    LoadStart {
        url: String,
    },
    LoadFinished,
    LoadError {
        description: String,
    },
    Retry,
    CancelError,
    NavState {
        url: String,
        #[serde(default)]
        can_go_back: bool,
    },
    Progress {
        fraction: f64,
    },
    /// A bridge message; a string payload is passed through unparsed
    Message {
        payload: Value,
        #[serde(default = "primary_source")]
        source: MessageSource,
    },
    Link {
        url: String,
    },
    TokenRefresh {
        token: String,
    },
    OpenWindow {
        url: String,
    },
    Request {
        url: String,
        #[serde(default = "primary_origin")]
        origin: RequestOrigin,
    },
    OverlayLoaded,
    OverlayNav {
        url: String,
        #[serde(default)]
        can_go_back: bool,
        #[serde(default)]
        title: Option<String>,
    },
    Notification {
        kind: NotificationEvent,
        #[serde(default)]
        payload: NotificationPayload,
        /// Confirm the foreground alert right away
        #[serde(default)]
        accept: bool,
    },
    Back,
    Wait {
        ms: u64,
    },
}

fn primary_source() -> MessageSource {
    MessageSource::Primary
}

fn primary_origin() -> RequestOrigin {
    RequestOrigin::Primary
}

/// Parse one script line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> serde_json::Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

pub async fn apply(shell: &Shell, event: Event) -> anyhow::Result<()> {
    match event {
        Event::LoadStart { url } => {
            shell.on_load_start(&url);
        }
        Event::LoadFinished => shell.on_load_finished(),
        Event::LoadError { description } => shell.on_load_error(&description),
        Event::Retry => {
            shell.router().retry_load()?;
        }
        Event::CancelError => shell.router().cancel_load_error()?,
        Event::NavState { url, can_go_back } => shell.on_navigation_state_changed(&url, can_go_back),
        Event::Progress { fraction } => shell.on_load_progress(fraction),
        Event::Message { payload, source } => {
            let raw = match payload {
                Value::String(raw) => raw,
                other => other.to_string(),
            };
            let action = shell.on_bridge_message(&raw, source);
            tracing::debug!(action = ?action, "Bridge message applied");
        }
        Event::Link { url } => {
            let outcome = shell.on_incoming_link(&url)?;
            tracing::info!(url = %url, outcome = ?outcome, "Link");
        }
        Event::TokenRefresh { token } => {
            shell.on_token_refresh(&token);
        }
        Event::OpenWindow { url } => {
            let decision = shell.on_open_window(&url);
            tracing::info!(url = %url, decision = ?decision, "Open window");
        }
        Event::Request { url, origin } => {
            let load = shell.should_start_load(&url, origin);
            tracing::info!(url = %url, origin = ?origin, load, "Navigation request");
        }
        Event::OverlayLoaded => shell.on_overlay_load_finished(),
        Event::OverlayNav {
            url,
            can_go_back,
            title,
        } => shell.on_overlay_navigation_state_changed(&url, can_go_back, title.as_deref()),
        Event::Notification {
            kind,
            payload,
            accept,
        } => {
            let outcome = shell.on_notification(kind, &payload);
            if let (true, Some(alert)) = (accept, &outcome.alert) {
                shell.accept_notification(alert)?;
            }
        }
        Event::Back => {
            let handled = shell.handle_back();
            tracing::info!(handled, "Back");
        }
        Event::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
    }
    Ok(())
}
