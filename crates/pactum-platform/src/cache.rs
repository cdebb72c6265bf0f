use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use tokio::sync::RwLock;

/// Short-TTL key-value collaborator used for OTP records, the public-token
/// index, and counters. Strictly an accelerant: nothing stored here may be
/// the sole record of a fact that outlives its TTL.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;
    /// Increments the counter at `key`, applying `ttl_seconds` only on the
    /// first increment of a window. Returns the post-increment value.
    async fn incr_with_expiry(&self, key: &str, ttl_seconds: u64) -> Result<i64>;
    async fn ping(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        match ttl_seconds {
            Some(ttl) => {
                let _: () = connection.set_ex(key, value, ttl).await?;
            }
            None => {
                let _: () = connection.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let _: i64 = connection.del(key).await?;
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl_seconds: u64) -> Result<i64> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let value: i64 = connection.incr(key, 1).await?;
        if value == 1 {
            let _: bool = connection.expire(key, ttl_seconds as i64).await?;
        }
        Ok(value)
    }

    async fn ping(&self) -> Result<()> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok(())
    }
}

struct MemEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }
}

/// In-process stand-in for Redis with the same observable semantics,
/// backing tests and local development.
#[derive(Default)]
pub struct MemCache {
    entries: RwLock<HashMap<String, MemEntry>>,
}

#[async_trait]
impl Cache for MemCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            MemEntry {
                value: value.to_string(),
                expires_at: ttl_seconds.map(|ttl| Instant::now() + Duration::from_secs(ttl)),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, ttl_seconds: u64) -> Result<i64> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired() {
                let current: i64 = entry
                    .value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("value at '{key}' is not an integer"))?;
                entry.value = (current + 1).to_string();
                return Ok(current + 1);
            }
        }

        entries.insert(
            key.to_string(),
            MemEntry {
                value: "1".to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_seconds)),
            },
        );
        Ok(1)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_round_trip() {
        let cache = MemCache::default();
        cache.set("k", "v", None).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_overwrites_prior_value() {
        let cache = MemCache::default();
        cache.set("k", "first", Some(60)).await.unwrap();
        cache.set("k", "second", Some(60)).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some("second".to_string()));
    }

    #[tokio::test]
    async fn del_removes_the_entry() {
        let cache = MemCache::default();
        cache.set("k", "v", None).await.unwrap();
        cache.del("k").await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MemCache::default();
        cache.set("k", "v", Some(1)).await.unwrap();

        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn incr_counts_from_one_within_a_window() {
        let cache = MemCache::default();

        assert_eq!(cache.incr_with_expiry("hits", 60).await.unwrap(), 1);
        assert_eq!(cache.incr_with_expiry("hits", 60).await.unwrap(), 2);
        assert_eq!(cache.incr_with_expiry("hits", 60).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn incr_restarts_after_window_expiry() {
        let cache = MemCache::default();

        assert_eq!(cache.incr_with_expiry("hits", 1).await.unwrap(), 1);
        assert_eq!(cache.incr_with_expiry("hits", 1).await.unwrap(), 2);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cache.incr_with_expiry("hits", 1).await.unwrap(), 1);
    }
}
