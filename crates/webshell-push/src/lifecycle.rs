//! Push Token Lifecycle
//!
//! First start: permission → token issuance → durable cache. Later starts
//! return the cached token without talking to the platform. Refreshes
//! overwrite the cache and are broadcast to listeners; nothing already built
//! from the old value is touched.
//!
//! Every failure here is survivable. Callers log it and run token-less.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use webshell_storage::{keys, Database};

use crate::error::PushError;
use crate::platform::PushPlatform;
use crate::token::{PushToken, TokenHandle};
use crate::Result;

pub type RefreshListener = Arc<dyn Fn(&PushToken) + Send + Sync>;

pub struct PushTokenLifecycle {
    platform: Arc<dyn PushPlatform>,
    db: Database,
    token: TokenHandle,
    listeners: Arc<RwLock<Vec<RefreshListener>>>,
    /// Bumped by every refresh; a registration started under an older value
    /// must not overwrite the refreshed token
    refresh_generation: Arc<Mutex<u64>>,
}

impl PushTokenLifecycle {
    pub fn new(platform: Arc<dyn PushPlatform>, db: Database) -> Self {
        Self {
            platform,
            db,
            token: TokenHandle::new(),
            listeners: Arc::new(RwLock::new(Vec::new())),
            refresh_generation: Arc::new(Mutex::new(0)),
        }
    }

    /// Shared read handle, updated on every refresh.
    pub fn handle(&self) -> TokenHandle {
        self.token.clone()
    }

    pub async fn initialize(&self) -> Result<PushToken> {
        let generation = *self.refresh_generation.lock();
        if let Some(token) = self.token.get() {
            return Ok(token);
        }

        if let Some(cached) = self.load_cached()? {
            tracing::info!("Using cached push token");
            self.token.set(Some(cached.clone()));
            return Ok(cached);
        }

        tracing::info!("Requesting notification permission");
        let status = self.platform.request_permission().await?;
        if !status.allows_token() {
            tracing::warn!(status = ?status, "Notification permission not granted");
            return Err(PushError::PermissionDenied);
        }

        self.register(generation).await
    }

    /// Current token: memory, then cache, then a fresh registration.
    pub async fn get_token(&self) -> Result<PushToken> {
        let generation = *self.refresh_generation.lock();
        if let Some(token) = self.token.get() {
            return Ok(token);
        }

        if let Some(cached) = self.load_cached()? {
            self.token.set(Some(cached.clone()));
            return Ok(cached);
        }

        self.register(generation).await
    }

    pub fn current(&self) -> Option<PushToken> {
        self.token.get()
    }

    pub fn on_refresh(&self, listener: RefreshListener) {
        self.listeners.write().push(listener);
    }

    /// Platform-issued refresh. Arrives at any time, possibly before
    /// `initialize` finished.
    pub fn handle_refresh(&self, value: &str) -> Option<PushToken> {
        if value.is_empty() {
            tracing::warn!("Ignoring empty push token refresh");
            return None;
        }

        let token = PushToken::new(value);
        {
            let mut generation = self.refresh_generation.lock();
            *generation += 1;
            self.token.set(Some(token.clone()));
            if let Err(e) = self.db.set_json(keys::PUSH_TOKEN, &token) {
                tracing::error!(error = %e, "Failed to cache refreshed push token");
            }
        }
        tracing::info!("Push token refreshed");

        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(&token);
        }

        Some(token)
    }

    /// Drop the token on the platform and locally. The next `get_token`
    /// registers again.
    pub async fn invalidate(&self) -> Result<()> {
        self.platform.delete_token().await?;
        self.token.set(None);
        self.db.remove(keys::PUSH_TOKEN)?;
        tracing::info!("Push token deleted");
        Ok(())
    }

    pub async fn subscribe_topic(&self, topic: &str) -> Result<()> {
        self.platform.subscribe_topic(topic).await?;
        tracing::info!(topic = %topic, "Subscribed to topic");
        Ok(())
    }

    pub async fn unsubscribe_topic(&self, topic: &str) -> Result<()> {
        self.platform.unsubscribe_topic(topic).await?;
        tracing::info!(topic = %topic, "Unsubscribed from topic");
        Ok(())
    }

    /// Fetch a token from the platform. `started` is the refresh generation
    /// seen before the first await.
    async fn register(&self, started: u64) -> Result<PushToken> {
        let value = match self.platform.fetch_token().await {
            Ok(Some(value)) if !value.is_empty() => value,
            Ok(_) => return Err(PushError::RegistrationFailed("no token issued".to_string())),
            Err(e) => return Err(PushError::RegistrationFailed(e.to_string())),
        };

        let generation = self.refresh_generation.lock();
        if *generation != started {
            if let Some(refreshed) = self.token.get() {
                tracing::info!("Push token refreshed during registration, keeping refreshed value");
                return Ok(refreshed);
            }
        }

        let token = PushToken::new(value);
        self.db.set_json(keys::PUSH_TOKEN, &token)?;
        self.token.set(Some(token.clone()));
        drop(generation);
        tracing::info!("Push token registered");

        Ok(token)
    }

    fn load_cached(&self) -> Result<Option<PushToken>> {
        let Some(raw) = self.db.get(keys::PUSH_TOKEN)? else {
            return Ok(None);
        };

        let token = serde_json::from_str::<PushToken>(&raw).unwrap_or_else(|_| PushToken::new(raw));
        Ok(Some(token).filter(|t| !t.value.is_empty()))
    }
}

impl Clone for PushTokenLifecycle {
    fn clone(&self) -> Self {
        Self {
            platform: Arc::clone(&self.platform),
            db: self.db.clone(),
            token: self.token.clone(),
            listeners: Arc::clone(&self.listeners),
            refresh_generation: Arc::clone(&self.refresh_generation),
        }
    }
}
