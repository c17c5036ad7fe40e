//! Login nonce cache
//!
//! Stores the one-time nonce handed to a user during challenge-response login.
//! Nonces live under `nonce:<user id>` and expire after ten minutes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::constants::nonce::{DEFAULT_REDIS_URL, EXPIRY, KEY_PREFIX};
use crate::error::{HarnessError, Result};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NonceCacheConfig {
    pub redis_url: String,
    pub expiry: Duration,
    pub key_prefix: String,
}

impl Default for NonceCacheConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            expiry: EXPIRY,
            key_prefix: KEY_PREFIX.to_string(),
        }
    }
}

/// Key-value backend with per-key expiry
#[async_trait]
pub trait NonceStore: Send + Sync {
    async fn set_with_expiry(&self, key: &str, value: &str, expiry: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Expiry in whole milliseconds for `PSETEX`, which rejects zero
fn expiry_millis(expiry: Duration) -> u64 {
    u64::try_from(expiry.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Redis backend
pub struct RedisNonceStore {
    connection: MultiplexedConnection,
}

impl RedisNonceStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!(url, "Connected to nonce store");
        Ok(Self { connection })
    }

    /// Closes the connection once every clone of it is dropped
    pub async fn disconnect(self) -> Result<()> {
        drop(self.connection);
        info!("Disconnected from nonce store");
        Ok(())
    }
}

#[async_trait]
impl NonceStore for RedisNonceStore {
    async fn set_with_expiry(&self, key: &str, value: &str, expiry: Duration) -> Result<()> {
        let mut connection = self.connection.clone();
        connection
            .pset_ex::<_, _, ()>(key, value, expiry_millis(expiry))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        Ok(connection.get::<_, Option<String>>(key).await?)
    }
}

/// In-process backend, expiry follows the tokio clock
#[derive(Default)]
pub struct MemoryNonceStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryNonceStore {
    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>>> {
        self.entries
            .lock()
            .map_err(|_| HarnessError::Nonce("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn set_with_expiry(&self, key: &str, value: &str, expiry: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries()?;
        entries.retain(|_, (_, deadline)| now < *deadline);
        entries.insert(key.to_string(), (value.to_string(), now + expiry));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries()?;
        match entries.get(key) {
            Some((_, deadline)) if Instant::now() >= *deadline => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }
}

pub struct NonceCache<S> {
    store: S,
    config: NonceCacheConfig,
}

impl<S: NonceStore> NonceCache<S> {
    pub fn new(store: S, config: NonceCacheConfig) -> Self {
        Self { store, config }
    }

    pub fn key(&self, user_id: &str) -> String {
        format!("{}{}", self.config.key_prefix, user_id)
    }

    /// Stores `nonce` for `user_id`, replacing any previous one
    pub async fn set_nonce(&self, user_id: &str, nonce: &str) -> Result<()> {
        debug!(user_id, "Storing login nonce");
        self.store
            .set_with_expiry(&self.key(user_id), nonce, self.config.expiry)
            .await
    }

    pub async fn get_nonce(&self, user_id: &str) -> Result<Option<String>> {
        self.store.get(&self.key(user_id)).await
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl NonceCache<RedisNonceStore> {
    pub async fn connect(config: NonceCacheConfig) -> Result<Self> {
        let store = RedisNonceStore::connect(&config.redis_url).await?;
        Ok(Self::new(store, config))
    }

    pub async fn disconnect(self) -> Result<()> {
        self.store.disconnect().await
    }
}
