mod counter;
mod executor;
mod queue;
mod records;

pub use counter::ConcurrencyCounterStore;
pub use executor::WorkflowExecutor;
pub use queue::WorkQueue;
pub use records::ExecutionRecordStore;
