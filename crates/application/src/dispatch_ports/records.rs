use async_trait::async_trait;
use permset_core::{AppResult, PhysicalResourceId};
use permset_domain::ExecutionRecord;

/// Persistence port for execution records keyed by physical resource id.
#[async_trait]
pub trait ExecutionRecordStore: Send + Sync {
    /// Stores or replaces the record for one resource.
    async fn put_record(&self, record: ExecutionRecord) -> AppResult<()>;

    /// Returns the record for one resource.
    async fn find_record(
        &self,
        physical_resource_id: &PhysicalResourceId,
    ) -> AppResult<Option<ExecutionRecord>>;

    /// Deletes the record for one resource.
    async fn delete_record(&self, physical_resource_id: &PhysicalResourceId) -> AppResult<()>;
}
