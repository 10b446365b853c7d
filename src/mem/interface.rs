use crate::cpu::request::RequestId;
use crate::timeq::Cycle;

/// Opaque handle the memory interface assigns to each accepted sub-request.
pub type SubRequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOp {
    Read,
    Write,
    Custom(u32),
}

/// One cache-line-contained piece of a logical request, already translated to a physical
/// address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRequest {
    pub addr: u64,
    pub size: u64,
    pub op: MemOp,
    pub origin: RequestId,
}

/// Downstream memory port.  Accepting a request never fails; the completion for the returned
/// id is delivered back to the issuing engine later, in no particular order.
pub trait MemoryInterface {
    fn issue(&mut self, now: Cycle, request: MemRequest) -> SubRequestId;
}
