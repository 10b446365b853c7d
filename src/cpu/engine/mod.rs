use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;

use crate::cpu::config::CpuConfig;
use crate::cpu::inflight::CpuRequest;
use crate::cpu::queue::RequestQueue;
use crate::cpu::request::{ReqOperation, Request, RequestId, RequestIdGen};
use crate::mem::{MemoryInterface, MemoryManager, PageMapMode, SubRequestId};
use crate::sim::log::Logger;
use crate::timeq::Cycle;
use crate::traffic::RequestGenerator;
use crate::info;

mod completions;
mod issue;
mod metrics;
mod split;

#[cfg(test)]
mod tests;

pub use metrics::*;
pub use split::split_range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for the generator to produce work.
    Filling,
    Issuing,
    /// Generator finished and queue empty; waiting on in-flight completions.
    Draining,
    Done,
}

/// Per-core request issue engine.  Pulls requests from a generator into a pending queue and,
/// once per cycle, dispatches what the issue limits, dependencies and fences allow.
pub struct IssueEngine<M: MemoryInterface> {
    max_reqs_cycle: usize,
    max_reorder_lookups: usize,
    max_pending_per_op: u32,
    cache_line: u64,
    state: EngineState,
    generator: Box<dyn RequestGenerator>,
    mem: M,
    mem_mgr: MemoryManager,
    ids: RequestIdGen,
    pending: RequestQueue<Request>,
    // sub-request id -> logical request it belongs to
    inflight_parts: HashMap<SubRequestId, RequestId>,
    inflight: HashMap<RequestId, CpuRequest>,
    // outstanding logical requests, indexed by ReqOperation::mem_index
    outstanding: [u32; ReqOperation::MEM_OPS.len()],
    stats: CpuStats,
    logger: Arc<Logger>,
}

impl<M: MemoryInterface> IssueEngine<M> {
    pub fn new(
        config: &CpuConfig,
        generator: Box<dyn RequestGenerator>,
        mem: M,
        logger: Arc<Logger>,
    ) -> anyhow::Result<Self> {
        Self::with_ids(config, generator, mem, RequestIdGen::default(), logger)
    }

    /// Like `new`, with the request-id sequence supplied by the caller.
    pub fn with_ids(
        config: &CpuConfig,
        generator: Box<dyn RequestGenerator>,
        mem: M,
        ids: RequestIdGen,
        logger: Arc<Logger>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let mode: PageMapMode = config.pagemap.parse()?;
        let mem_mgr =
            MemoryManager::new(config.pagesize, config.pagecount, mode, config.pagemap_seed)?;
        info!(
            logger,
            "generator={} max_reqs_cycle={} reorder={} line={} pending/op={} pagemap={:?}",
            generator.name(),
            config.max_reqs_cycle,
            config.max_reorder_lookups,
            config.cache_line_size,
            config.maxmemreqpending,
            mode
        );
        Ok(Self {
            max_reqs_cycle: config.max_reqs_cycle as usize,
            max_reorder_lookups: config.max_reorder_lookups as usize,
            max_pending_per_op: config.maxmemreqpending,
            cache_line: config.cache_line_size,
            state: EngineState::Filling,
            generator,
            mem,
            mem_mgr,
            ids,
            pending: RequestQueue::new(),
            inflight_parts: HashMap::new(),
            inflight: HashMap::new(),
            outstanding: [0; ReqOperation::MEM_OPS.len()],
            stats: CpuStats::default(),
            logger,
        })
    }

    /// Advances one cycle.  Returns `true` once the engine is done and needs no more ticks.
    pub fn tick(&mut self, now: Cycle) -> bool {
        if self.state == EngineState::Done {
            return true;
        }
        if self.finish_if_drained(now) {
            return true;
        }

        self.refill();
        if self.pending.empty() {
            self.state = if self.generator.is_finished() {
                EngineState::Draining
            } else {
                EngineState::Filling
            };
            self.stats.record_cycle(CycleOutcome::default());
        } else {
            self.state = EngineState::Issuing;
            let outcome = self.issue_cycle(now);
            self.stats.record_cycle(outcome);
            if self.pending.empty() && self.generator.is_finished() {
                self.state = EngineState::Draining;
            }
        }

        self.finish_if_drained(now)
    }

    /// Swaps in the next generator once the current one has fully drained.  The engine goes
    /// back to Filling; request ids keep counting from where the previous generator stopped.
    pub fn load_generator(&mut self, generator: Box<dyn RequestGenerator>) -> anyhow::Result<()> {
        if self.state != EngineState::Done {
            bail!(
                "cannot load generator {} while {} is still running ({:?})",
                generator.name(),
                self.generator.name(),
                self.state
            );
        }
        info!(
            self.logger,
            "loading generator {} after {}",
            generator.name(),
            self.generator.name()
        );
        self.generator = generator;
        self.state = EngineState::Filling;
        Ok(())
    }

    fn refill(&mut self) {
        if self.generator.is_finished() || self.pending.size() >= self.max_reorder_lookups {
            return;
        }
        let first_new = self.ids.peek();
        let before = self.pending.size();
        self.generator.generate(&mut self.pending, &mut self.ids);
        if self.pending.size() > before {
            self.prune_retired_dependencies(before, first_new);
        }
    }

    fn finish_if_drained(&mut self, now: Cycle) -> bool {
        if self.state != EngineState::Draining || !self.inflight.is_empty() {
            return false;
        }
        self.generator.completed();
        self.stats.record_finish(now);
        self.state = EngineState::Done;
        info!(
            self.logger,
            "generator {} done at cycle {} after {} cycles",
            self.generator.name(),
            now,
            self.stats.cycles
        );
        true
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == EngineState::Done
    }

    pub fn stats(&self) -> &CpuStats {
        &self.stats
    }

    pub fn pending(&self) -> &RequestQueue<Request> {
        &self.pending
    }

    pub fn inflight_requests(&self) -> usize {
        self.inflight.len()
    }

    pub fn inflight_parts(&self) -> usize {
        self.inflight_parts.len()
    }

    pub fn inflight_request(&self, id: RequestId) -> Option<&CpuRequest> {
        self.inflight.get(&id)
    }

    pub fn outstanding(&self, op: ReqOperation) -> u32 {
        op.mem_index().map(|slot| self.outstanding[slot]).unwrap_or(0)
    }

    pub fn mem(&self) -> &M {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut M {
        &mut self.mem
    }
}
