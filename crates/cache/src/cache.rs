//! Cache traits.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::Result;

/// A string key-value cache with per-entry expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the name of this backend, for logs.
    fn name(&self) -> &'static str;

    /// Returns the cached value, or `None` on a miss or expired entry.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Removes the entry. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// JSON helpers on top of any [`Cache`].
#[async_trait]
pub trait CacheExt: Cache {
    /// Reads and decodes a JSON value.
    async fn get_json<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores a JSON value.
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>
    where
        T: Serialize + Sync,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw, ttl).await
    }

    /// Removes several keys.
    ///
    /// Every key is attempted even after a failure; the first error is
    /// returned once all removals have run.
    async fn remove_all(&self, keys: &[String]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove(key).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

// Blanket implementation for all caches
impl<T: Cache + ?Sized> CacheExt for T {}
