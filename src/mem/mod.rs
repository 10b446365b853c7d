pub mod backend;
pub mod interface;
pub mod manager;

pub use backend::{LatencyMemory, MemCompletion, MemConfig};
pub use interface::{MemOp, MemRequest, MemoryInterface, SubRequestId};
pub use manager::{MemoryManager, PageMapMode};
