use crate::cpu::inflight::CpuRequest;
use crate::cpu::request::{Request, RequestBody};
use crate::debug;
use crate::mem::{MemOp, MemRequest, MemoryInterface};
use crate::timeq::Cycle;

use super::{split_range, CycleOutcome, IssueEngine};

impl<M: MemoryInterface> IssueEngine<M> {
    /// Scans the reorder window, then dispatches everything it selected in queue order.
    pub(super) fn issue_cycle(&mut self, now: Cycle) -> CycleOutcome {
        let window = self.pending.size().min(self.max_reorder_lookups);
        let mut outcome = CycleOutcome::default();
        let mut take: Vec<usize> = Vec::new();
        let mut reserved = self.outstanding;
        // a fence may only retire once nothing but retired fences sits in front of it and its
        // own dependencies are met
        let mut only_fences_ahead = true;
        let mut stopped_early = false;

        for idx in 0..window {
            let req = self.pending.at(idx);
            if req.is_fence() {
                if only_fences_ahead && self.inflight.is_empty() && req.can_issue() {
                    take.push(idx);
                    outcome.fences_retired += 1;
                    continue;
                }
                debug!(
                    self.logger,
                    "[{}] fence {} blocks issue ({} in flight)",
                    now,
                    req.id(),
                    self.inflight.len()
                );
                outcome.hit_fence = true;
                stopped_early = true;
                break;
            }
            only_fences_ahead = false;

            if !req.can_issue() {
                continue;
            }
            let Some(slot) = req.operation().mem_index() else {
                continue;
            };
            if reserved[slot] >= self.max_pending_per_op {
                continue;
            }

            reserved[slot] += 1;
            take.push(idx);
            outcome.issued += 1;
            if outcome.issued >= self.max_reqs_cycle {
                outcome.hit_issue_cap = true;
                stopped_early = true;
                break;
            }
        }

        outcome.hit_reorder_limit = !stopped_early && window == self.max_reorder_lookups;

        for req in self.pending.extract(&take) {
            if req.is_fence() {
                self.satisfy_dependents(req.id());
            } else {
                self.issue_request(now, req);
            }
        }
        outcome
    }

    fn issue_request(&mut self, now: Cycle, mut req: Request) {
        let op = req.operation();
        let (addr, length, mem_op) = match *req.body() {
            RequestBody::Read { addr, length } => (addr, length, MemOp::Read),
            RequestBody::Write { addr, length } => (addr, length, MemOp::Write),
            RequestBody::Custom {
                addr,
                length,
                opcode,
            } => (addr, length, MemOp::Custom(opcode)),
            RequestBody::Fence => return,
        };
        req.set_issue_time(now);

        let parts = split_range(addr, length, self.cache_line);
        let mut cpu_req = CpuRequest::new(req.id(), op);
        cpu_req.set_issue_time(now);
        for &(part_addr, part_len) in &parts {
            let sub = MemRequest {
                addr: self.mem_mgr.map_address(part_addr),
                size: part_len,
                op: mem_op,
                origin: req.id(),
            };
            let sub_id = self.mem.issue(now, sub);
            cpu_req.inc_part_count();
            if self.inflight_parts.insert(sub_id, req.id()).is_some() {
                log::warn!("memory interface reused in-flight id {}", sub_id);
            }
        }

        if let Some(slot) = op.mem_index() {
            self.outstanding[slot] += 1;
        }
        self.stats.record_issue(op, length, parts.len() > 1);
        debug!(
            self.logger,
            "[{}] issue {} {} addr={:#x} len={} parts={}",
            now,
            op.short(),
            req.id(),
            addr,
            length,
            parts.len()
        );
        let _ = self.inflight.insert(req.id(), cpu_req);
    }
}
