use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::client::Client;
use crate::config::ConnectionSource;
use crate::error::Result;

/// Age after which the process-wide client is rebuilt, picking up a rotated
/// connection URL.
pub const SHARED_CLIENT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct CachedClient {
    client: Client,
    created_at: DateTime<Utc>,
}

impl CachedClient {
    fn is_stale(&self, now: DateTime<Utc>, refresh_interval: Option<Duration>) -> bool {
        let Some(interval) = refresh_interval else {
            return false;
        };
        match chrono::Duration::from_std(interval) {
            Ok(interval) => now.signed_duration_since(self.created_at) >= interval,
            Err(_) => false,
        }
    }
}

/// A lazily built [`Client`] shared by every caller holding this context.
///
/// Creation and replacement happen under one lock; a failed build leaves the
/// previous state untouched. Requests themselves run outside the lock.
#[derive(Debug)]
pub struct SharedClient {
    source: ConnectionSource,
    refresh_interval: Option<Duration>,
    slot: Mutex<Option<CachedClient>>,
}

impl SharedClient {
    pub fn new(source: ConnectionSource, refresh_interval: Option<Duration>) -> Self {
        Self {
            source,
            refresh_interval,
            slot: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &ConnectionSource {
        &self.source
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }

    /// Returns the cached client, building it first if absent or stale.
    pub fn client(&self) -> Result<Client> {
        self.client_at(Utc::now())
    }

    fn client_at(&self, now: DateTime<Utc>) -> Result<Client> {
        let mut slot = self.lock();
        if let Some(cached) = slot.as_ref()
            && !cached.is_stale(now, self.refresh_interval)
        {
            return Ok(cached.client.clone());
        }

        let refreshing = slot.is_some();
        let client = self.source.connect()?;
        if refreshing {
            info!("refreshed shared database client");
        } else {
            debug!("initialized shared database client");
        }
        *slot = Some(CachedClient {
            client: client.clone(),
            created_at: now,
        });
        Ok(client)
    }

    /// When the cached client was built, if one exists.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.lock().as_ref().map(|cached| cached.created_at)
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    /// Drops the cached client so the next call rebuilds it.
    pub fn reset(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedClient>> {
        // The slot is only ever replaced wholesale, so a poisoned value is
        // still consistent.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn get(&self, key: &str) -> Result<String> {
        self.client()?.get(key).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.client()?.get_json(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.client()?.set(key, value).await
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.client()?.set_json(key, value).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client()?.delete(key).await
    }

    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.client()?.list_keys(prefix).await
    }
}

/// The process-wide client behind the free functions, discovered from the
/// default [`ConnectionSource`] and refreshed hourly.
pub fn shared() -> &'static SharedClient {
    static SHARED: OnceLock<SharedClient> = OnceLock::new();
    SHARED.get_or_init(|| {
        SharedClient::new(
            ConnectionSource::default(),
            Some(SHARED_CLIENT_REFRESH_INTERVAL),
        )
    })
}

/// Returns the value for `key`, or [`Error::NotFound`](crate::Error::NotFound).
pub async fn get(key: &str) -> Result<String> {
    shared().get(key).await
}

/// Decodes the JSON value stored under `key`.
pub async fn get_json<T: DeserializeOwned>(key: &str) -> Result<T> {
    shared().get_json(key).await
}

/// Creates or updates `key` with `value`.
pub async fn set(key: &str, value: &str) -> Result<()> {
    shared().set(key, value).await
}

/// Stores the JSON serialization of `value` under `key`.
pub async fn set_json<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<()> {
    shared().set_json(key, value).await
}

/// Removes `key`. Deleting a missing key succeeds.
pub async fn delete(key: &str) -> Result<()> {
    shared().delete(key).await
}

/// Lists every key starting with `prefix` in lexicographic order.
pub async fn list_keys(prefix: &str) -> Result<Vec<String>> {
    shared().list_keys(prefix).await
}
