pub mod config;
pub mod engine;
pub mod inflight;
pub mod queue;
pub mod request;

pub use config::CpuConfig;
pub use engine::{CpuStats, EngineState, IssueEngine};
pub use inflight::CpuRequest;
pub use queue::RequestQueue;
pub use request::{ReqOperation, Request, RequestBody, RequestId, RequestIdGen};
