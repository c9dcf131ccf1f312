//! Redis-backed concurrency counter for the dispatcher.

use async_trait::async_trait;
use permset_application::ConcurrencyCounterStore;
use permset_core::{AppError, AppResult};
use permset_domain::ConcurrencyLimit;
use redis::{AsyncCommands, Script};

const INCREMENT_BELOW_LIMIT_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current < tonumber(ARGV[1]) then
  redis.call('INCR', KEYS[1])
  return 1
else
  return 0
end
"#;

const DECREMENT_ABOVE_ZERO_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current >= 1 then
  redis.call('DECR', KEYS[1])
  return 1
else
  return 0
end
"#;

/// Redis implementation of the bounded execution counter.
#[derive(Clone)]
pub struct RedisConcurrencyCounterStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisConcurrencyCounterStore {
    /// Creates one counter adapter.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, key: &str) -> String {
        format!("{}:{key}", self.key_prefix)
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Dependency(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl ConcurrencyCounterStore for RedisConcurrencyCounterStore {
    async fn ensure_counter(&self, key: &str) -> AppResult<()> {
        let mut connection = self.connection().await?;
        let created: bool = connection
            .set_nx(self.key_for(key), 0_u32)
            .await
            .map_err(|error| {
                AppError::Dependency(format!("failed to initialize counter '{key}': {error}"))
            })?;

        if created {
            tracing::info!(counter = %key, "concurrency counter initialized");
        }

        Ok(())
    }

    async fn try_increment(&self, key: &str, limit: ConcurrencyLimit) -> AppResult<bool> {
        let mut connection = self.connection().await?;
        let incremented = Script::new(INCREMENT_BELOW_LIMIT_SCRIPT)
            .key(self.key_for(key))
            .arg(limit.value())
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Dependency(format!("failed to increment counter '{key}': {error}"))
            })?;

        Ok(incremented == 1)
    }

    async fn try_decrement(&self, key: &str) -> AppResult<bool> {
        let mut connection = self.connection().await?;
        let decremented = Script::new(DECREMENT_ABOVE_ZERO_SCRIPT)
            .key(self.key_for(key))
            .invoke_async::<i32>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Dependency(format!("failed to decrement counter '{key}': {error}"))
            })?;

        Ok(decremented == 1)
    }

    async fn current_count(&self, key: &str) -> AppResult<u32> {
        let mut connection = self.connection().await?;
        let value: Option<u32> = connection.get(self.key_for(key)).await.map_err(|error| {
            AppError::Dependency(format!("failed to read counter '{key}': {error}"))
        })?;

        Ok(value.unwrap_or(0))
    }
}
