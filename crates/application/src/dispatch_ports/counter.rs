use async_trait::async_trait;
use permset_core::AppResult;
use permset_domain::ConcurrencyLimit;

/// Durable counter of running executions per workflow.
///
/// Every mutation is a conditional write: a failed condition leaves the
/// counter untouched and is reported as `false`, never as an error.
#[async_trait]
pub trait ConcurrencyCounterStore: Send + Sync {
    /// Creates the counter at zero when it does not exist yet.
    async fn ensure_counter(&self, key: &str) -> AppResult<()>;

    /// Increments the counter when it is below the limit.
    async fn try_increment(&self, key: &str, limit: ConcurrencyLimit) -> AppResult<bool>;

    /// Decrements the counter when it is at least one.
    async fn try_decrement(&self, key: &str) -> AppResult<bool>;

    /// Returns the current value, zero when the counter does not exist.
    async fn current_count(&self, key: &str) -> AppResult<u32>;
}
