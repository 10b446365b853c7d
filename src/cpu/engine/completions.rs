use std::collections::HashSet;

use log::warn;

use crate::cpu::request::RequestId;
use crate::debug;
use crate::mem::{MemoryInterface, SubRequestId};
use crate::timeq::Cycle;

use super::IssueEngine;

impl<M: MemoryInterface> IssueEngine<M> {
    /// Delivers the completion of one sub-request.  Returns the logical request's latency if
    /// this was its last outstanding part.
    pub fn handle_completion(&mut self, sub_id: SubRequestId, now: Cycle) -> Option<Cycle> {
        let Some(origin) = self.inflight_parts.remove(&sub_id) else {
            warn!("completion for unknown sub-request {} at cycle {}", sub_id, now);
            return None;
        };
        let cpu_req = self.inflight.get_mut(&origin)?;
        cpu_req.dec_part_count();
        if !cpu_req.completed() {
            return None;
        }

        let cpu_req = self.inflight.remove(&origin)?;
        let latency = now.saturating_sub(cpu_req.issue_time());
        self.stats.record_latency(latency);
        if let Some(slot) = cpu_req.operation().mem_index() {
            self.outstanding[slot] = self.outstanding[slot].saturating_sub(1);
        }
        self.satisfy_dependents(cpu_req.original_req_id());
        debug!(
            self.logger,
            "[{}] complete {} {} latency={}",
            now,
            cpu_req.operation().short(),
            origin,
            latency
        );
        Some(latency)
    }

    /// Linear scan over the pending queue; O(queue length) per retired request.
    pub(super) fn satisfy_dependents(&mut self, id: RequestId) {
        for req in self.pending.iter_mut() {
            req.satisfy_dependency(id);
        }
    }

    /// Drops dependencies of freshly generated requests (queue positions `from..`) on ids that
    /// were handed out earlier but are neither pending nor in flight: those already retired and
    /// will never be satisfied by a completion.
    pub(super) fn prune_retired_dependencies(&mut self, from: usize, first_new: RequestId) {
        let needs_check = self
            .pending
            .iter()
            .skip(from)
            .any(|req| req.dependencies().iter().any(|dep| *dep < first_new));
        if !needs_check {
            return;
        }

        let live: HashSet<RequestId> = self
            .pending
            .iter()
            .take(from)
            .map(|req| req.id())
            .chain(self.inflight.keys().copied())
            .collect();
        for req in self.pending.iter_mut().skip(from) {
            let before = req.dependencies().len();
            req.retain_dependencies(|dep| *dep >= first_new || live.contains(dep));
            if req.dependencies().len() != before {
                debug!(
                    self.logger,
                    "request {} dropped {} dependencies on retired requests",
                    req.id(),
                    before - req.dependencies().len()
                );
            }
        }
    }
}
