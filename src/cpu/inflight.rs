use crate::cpu::request::{ReqOperation, RequestId};
use crate::timeq::Cycle;

/// Bookkeeping for one issued logical request, which may have been split into several
/// memory-interface sub-requests.
#[derive(Debug, Clone)]
pub struct CpuRequest {
    original_id: RequestId,
    op: ReqOperation,
    issue_time: Cycle,
    outstanding_parts: u32,
}

impl CpuRequest {
    pub fn new(original_id: RequestId, op: ReqOperation) -> Self {
        Self {
            original_id,
            op,
            issue_time: 0,
            outstanding_parts: 0,
        }
    }

    pub fn inc_part_count(&mut self) {
        self.outstanding_parts = self.outstanding_parts.saturating_add(1);
    }

    pub fn dec_part_count(&mut self) {
        debug_assert!(self.outstanding_parts > 0, "part count underflow");
        self.outstanding_parts = self.outstanding_parts.saturating_sub(1);
    }

    pub fn completed(&self) -> bool {
        self.outstanding_parts == 0
    }

    pub fn set_issue_time(&mut self, now: Cycle) {
        self.issue_time = now;
    }

    pub fn issue_time(&self) -> Cycle {
        self.issue_time
    }

    pub fn original_req_id(&self) -> RequestId {
        self.original_id
    }

    pub fn operation(&self) -> ReqOperation {
        self.op
    }

    pub fn count_parts(&self) -> u32 {
        self.outstanding_parts
    }
}
