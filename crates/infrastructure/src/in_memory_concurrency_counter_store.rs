use std::collections::HashMap;

use async_trait::async_trait;
use permset_application::ConcurrencyCounterStore;
use permset_core::AppResult;
use permset_domain::ConcurrencyLimit;
use tokio::sync::Mutex;

/// In-memory counter adapter for tests and local runs.
#[derive(Default)]
pub struct InMemoryConcurrencyCounterStore {
    counters: Mutex<HashMap<String, u32>>,
}

impl InMemoryConcurrencyCounterStore {
    /// Creates an empty in-memory counter store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConcurrencyCounterStore for InMemoryConcurrencyCounterStore {
    async fn ensure_counter(&self, key: &str) -> AppResult<()> {
        self.counters
            .lock()
            .await
            .entry(key.to_owned())
            .or_insert(0);

        Ok(())
    }

    async fn try_increment(&self, key: &str, limit: ConcurrencyLimit) -> AppResult<bool> {
        let mut counters = self.counters.lock().await;
        let Some(counter) = counters.get_mut(key) else {
            return Ok(false);
        };

        if *counter >= limit.value() {
            return Ok(false);
        }

        *counter += 1;
        Ok(true)
    }

    async fn try_decrement(&self, key: &str) -> AppResult<bool> {
        let mut counters = self.counters.lock().await;
        match counters.get_mut(key) {
            Some(counter) if *counter >= 1 => {
                *counter -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn current_count(&self, key: &str) -> AppResult<u32> {
        Ok(self.counters.lock().await.get(key).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use permset_application::ConcurrencyCounterStore;
    use permset_domain::ConcurrencyLimit;

    use super::InMemoryConcurrencyCounterStore;

    #[tokio::test]
    async fn increment_requires_initialized_counter() {
        let store = InMemoryConcurrencyCounterStore::new();

        let incremented = store
            .try_increment("workflow", ConcurrencyLimit::default())
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(!incremented);
    }

    #[tokio::test]
    async fn counter_stays_within_zero_and_limit() {
        let store = InMemoryConcurrencyCounterStore::new();
        let limit = ConcurrencyLimit::new(2).unwrap_or_else(|_| unreachable!());
        store
            .ensure_counter("workflow")
            .await
            .unwrap_or_else(|_| unreachable!());

        let mut admitted = Vec::new();
        for _ in 0..3 {
            admitted.push(
                store
                    .try_increment("workflow", limit)
                    .await
                    .unwrap_or_else(|_| unreachable!()),
            );
        }
        assert_eq!(admitted, [true, true, false]);

        let mut released = Vec::new();
        for _ in 0..3 {
            released.push(
                store
                    .try_decrement("workflow")
                    .await
                    .unwrap_or_else(|_| unreachable!()),
            );
        }
        assert_eq!(released, [true, true, false]);
        assert_eq!(
            store
                .current_count("workflow")
                .await
                .unwrap_or_else(|_| unreachable!()),
            0
        );
    }

    #[tokio::test]
    async fn ensure_keeps_existing_value() {
        let store = InMemoryConcurrencyCounterStore::new();
        store
            .ensure_counter("workflow")
            .await
            .unwrap_or_else(|_| unreachable!());
        store
            .try_increment("workflow", ConcurrencyLimit::default())
            .await
            .unwrap_or_else(|_| unreachable!());

        store
            .ensure_counter("workflow")
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(
            store
                .current_count("workflow")
                .await
                .unwrap_or_else(|_| unreachable!()),
            1
        );
    }
}
