//! Deep Link Queue
//!
//! Links can arrive before anything is able to navigate (cold start from a
//! link or a notification tap). Until a consumer is attached the newest link
//! is persisted in a single durable slot; an older unconsumed link is
//! overwritten. Attaching the consumer drains the slot exactly once.
//!
//! Registered handlers see every valid link, including repeats. Only the
//! consumer is shielded from the same link arriving twice in quick
//! succession.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use webshell_storage::{keys, Database};

use crate::link::ParsedLink;
use crate::Result;

/// Identical links closer together than this reach the consumer once.
pub const DUPLICATE_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeepLink {
    pub url: String,
    pub received_at: DateTime<Utc>,
}

/// What `enqueue` did with a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Handed straight to the ready consumer
    Delivered,
    /// Persisted until a consumer attaches
    Queued,
    /// Same link was just delivered; only handlers saw it
    Duplicate,
}

/// Last link seen, as recorded in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastDeepLink {
    pub url: Option<String>,
    pub data: Option<ParsedLink>,
}

/// Receives links once the navigation side is ready.
pub type LinkConsumer = Arc<dyn Fn(&str) + Send + Sync>;
/// Observes every valid link.
pub type LinkHandler = Arc<dyn Fn(&ParsedLink) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct QueueState {
    consumer: Option<LinkConsumer>,
    last_delivered: Option<(String, Instant)>,
}

pub struct DeepLinkQueue {
    db: Database,
    state: Arc<RwLock<QueueState>>,
    handlers: Arc<RwLock<Vec<(HandlerId, LinkHandler)>>>,
    next_handler_id: Arc<AtomicU64>,
    /// Held across every consumer decision and call, so deliveries happen in
    /// arrival order. The consumer must not enqueue.
    delivery: Arc<Mutex<()>>,
}

impl DeepLinkQueue {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            state: Arc::new(RwLock::new(QueueState {
                consumer: None,
                last_delivered: None,
            })),
            handlers: Arc::new(RwLock::new(Vec::new())),
            next_handler_id: Arc::new(AtomicU64::new(1)),
            delivery: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().consumer.is_some()
    }

    /// Accept an incoming link from any source (OS link, notification tap).
    pub fn enqueue(&self, url: &str) -> Result<EnqueueOutcome> {
        let link = ParsedLink::parse(url).map_err(|e| {
            tracing::warn!(url = %url, "Ignoring invalid deep link");
            e
        })?;
        tracing::info!(url = %url, "Deep link received");

        self.record_last(&link);
        self.notify_handlers(&link);

        let _delivery = self.delivery.lock();
        let consumer = {
            let mut state = self.state.write();
            match state.consumer.clone() {
                Some(consumer) => {
                    if let Some((last, at)) = &state.last_delivered {
                        if last == url && at.elapsed() < DUPLICATE_WINDOW {
                            tracing::debug!(url = %url, "Duplicate deep link suppressed");
                            return Ok(EnqueueOutcome::Duplicate);
                        }
                    }
                    state.last_delivered = Some((url.to_string(), Instant::now()));
                    Some(consumer)
                }
                None => None,
            }
        };

        match consumer {
            Some(consumer) => {
                consumer(url);
                Ok(EnqueueOutcome::Delivered)
            }
            None => {
                let pending = PendingDeepLink {
                    url: url.to_string(),
                    received_at: Utc::now(),
                };
                self.db.set_json(keys::PENDING_DEEP_LINK, &pending)?;
                tracing::info!(url = %url, "Deep link queued until navigation is ready");
                Ok(EnqueueOutcome::Queued)
            }
        }
    }

    /// Drain the pending slot into the consumer. Returns the delivered URL.
    /// Nothing happens while no consumer is attached.
    pub fn try_deliver(&self) -> Result<Option<String>> {
        let _delivery = self.delivery.lock();
        let Some(consumer) = self.state.read().consumer.clone() else {
            return Ok(None);
        };
        self.deliver_pending(&consumer)
    }

    /// Mark the navigation side ready and drain anything pending. A link
    /// enqueued meanwhile is delivered after the pending one.
    pub fn attach_consumer(&self, consumer: LinkConsumer) -> Result<Option<String>> {
        let _delivery = self.delivery.lock();
        self.state.write().consumer = Some(Arc::clone(&consumer));
        self.deliver_pending(&consumer)
    }

    fn deliver_pending(&self, consumer: &LinkConsumer) -> Result<Option<String>> {
        let Some(pending) = self.take_pending()? else {
            return Ok(None);
        };

        tracing::info!(
            url = %pending.url,
            received_at = %pending.received_at,
            "Delivering pending deep link"
        );
        self.state.write().last_delivered = Some((pending.url.clone(), Instant::now()));
        consumer(&pending.url);

        Ok(Some(pending.url))
    }

    /// Peek at the pending slot without draining it.
    pub fn pending(&self) -> Result<Option<PendingDeepLink>> {
        Ok(self.db.get_json(keys::PENDING_DEEP_LINK)?)
    }

    fn take_pending(&self) -> Result<Option<PendingDeepLink>> {
        let Some(raw) = self.db.take(keys::PENDING_DEEP_LINK)? else {
            return Ok(None);
        };

        match serde_json::from_str::<PendingDeepLink>(&raw) {
            Ok(pending) => Ok(Some(pending)),
            Err(e) => {
                // Plain URL written by an older build
                tracing::debug!(error = %e, "Pending deep link is not JSON, using raw value");
                Ok(Some(PendingDeepLink {
                    url: raw,
                    received_at: Utc::now(),
                }))
            }
        }
    }

    // === Handlers ===

    pub fn add_handler(&self, handler: LinkHandler) -> HandlerId {
        let id = HandlerId(self.next_handler_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, handler));
        id
    }

    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    fn notify_handlers(&self, link: &ParsedLink) {
        let handlers: Vec<LinkHandler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            if let Err(e) = handler(link) {
                tracing::error!(url = %link.full_url, error = %e, "Deep link handler failed");
            }
        }
    }

    // === History ===

    fn record_last(&self, link: &ParsedLink) {
        let result = self
            .db
            .set(keys::LAST_DEEPLINK_URL, &link.full_url)
            .and_then(|_| self.db.set_json(keys::LAST_DEEPLINK_DATA, link));
        if let Err(e) = result {
            tracing::error!(url = %link.full_url, error = %e, "Failed to record deep link");
        }
    }

    pub fn last_deep_link(&self) -> Result<LastDeepLink> {
        Ok(LastDeepLink {
            url: self.db.get(keys::LAST_DEEPLINK_URL)?,
            data: self.db.get_json(keys::LAST_DEEPLINK_DATA)?,
        })
    }
}

impl Clone for DeepLinkQueue {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            state: Arc::clone(&self.state),
            handlers: Arc::clone(&self.handlers),
            next_handler_id: Arc::clone(&self.next_handler_id),
            delivery: Arc::clone(&self.delivery),
        }
    }
}
