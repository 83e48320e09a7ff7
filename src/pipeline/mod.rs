pub mod context;
pub mod orchestrator;
pub mod pool;

pub use context::RunContext;
pub use orchestrator::AcquisitionOrchestrator;
pub use pool::WorkerPool;
