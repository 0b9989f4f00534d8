//! Notification handling
//!
//! Three delivery paths:
//! - Foreground: show an alert; the link in `data.url` is followed only if
//!   the user confirms it
//! - Background: data only, nothing is shown
//! - Opened (user tapped the notification): follow `data.url` right away
//!
//! Every path records the payload under `last_notification_data` with a
//! `receivedAt` stamp. The returned record is what the page receives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use webshell_storage::{keys, Database};

/// Data key holding the deep link of a notification.
pub const LINK_DATA_KEY: &str = "url";
pub const DEFAULT_ALERT_TITLE: &str = "Notification";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl NotificationPayload {
    pub fn deep_link(&self) -> Option<&str> {
        self.data
            .get(LINK_DATA_KEY)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
    }

    fn has_notification(&self) -> bool {
        self.title.is_some() || self.body.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationEvent {
    Foreground,
    Background,
    Opened,
}

/// Stored and forwarded form: the data fields plus `receivedAt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(flatten)]
    pub data: BTreeMap<String, String>,
    #[serde(rename = "receivedAt")]
    pub received_at: DateTime<Utc>,
}

/// Alert for a foreground notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAlert {
    pub title: String,
    pub body: String,
    /// Followed when the user confirms
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub record: NotificationRecord,
    pub alert: Option<NotificationAlert>,
    /// Link to follow immediately
    pub deep_link: Option<String>,
}

pub struct NotificationProcessor {
    db: Database,
}

impl NotificationProcessor {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn process(&self, event: NotificationEvent, payload: &NotificationPayload) -> NotificationOutcome {
        tracing::info!(event = ?event, title = ?payload.title, "Notification received");

        let alert = match event {
            NotificationEvent::Foreground if payload.has_notification() => Some(NotificationAlert {
                title: payload
                    .title
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ALERT_TITLE.to_string()),
                body: payload.body.clone().unwrap_or_default(),
                link: payload.deep_link().map(str::to_string),
            }),
            _ => None,
        };

        let deep_link = match event {
            NotificationEvent::Opened => payload.deep_link().map(str::to_string),
            NotificationEvent::Foreground | NotificationEvent::Background => None,
        };

        let record = NotificationRecord {
            data: payload.data.clone(),
            received_at: Utc::now(),
        };
        if let Err(e) = self.db.set_json(keys::LAST_NOTIFICATION_DATA, &record) {
            tracing::error!(error = %e, "Failed to store notification data");
        }

        NotificationOutcome {
            record,
            alert,
            deep_link,
        }
    }

    pub fn last_notification(&self) -> Option<NotificationRecord> {
        match self.db.get_json(keys::LAST_NOTIFICATION_DATA) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read notification data");
                None
            }
        }
    }
}

impl Clone for NotificationProcessor {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
        }
    }
}
