use std::collections::HashMap;

use async_trait::async_trait;
use permset_application::ExecutionRecordStore;
use permset_core::{AppResult, PhysicalResourceId};
use permset_domain::ExecutionRecord;
use tokio::sync::RwLock;

/// In-memory execution record adapter for tests and local runs.
#[derive(Default)]
pub struct InMemoryExecutionRecordStore {
    records: RwLock<HashMap<String, ExecutionRecord>>,
}

impl InMemoryExecutionRecordStore {
    /// Creates an empty in-memory record store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExecutionRecordStore for InMemoryExecutionRecordStore {
    async fn put_record(&self, record: ExecutionRecord) -> AppResult<()> {
        self.records
            .write()
            .await
            .insert(record.physical_resource_id.as_str().to_owned(), record);

        Ok(())
    }

    async fn find_record(
        &self,
        physical_resource_id: &PhysicalResourceId,
    ) -> AppResult<Option<ExecutionRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(physical_resource_id.as_str())
            .cloned())
    }

    async fn delete_record(&self, physical_resource_id: &PhysicalResourceId) -> AppResult<()> {
        self.records
            .write()
            .await
            .remove(physical_resource_id.as_str());

        Ok(())
    }
}
