use serde::Serialize;

use crate::cpu::request::ReqOperation;
use crate::timeq::Cycle;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OpCounters {
    pub reqs: u64,
    pub bytes: u64,
    pub split_reqs: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub sum: u64,
    pub max: u64,
}

impl LatencySummary {
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LatencyHistogram {
    pub buckets: [u64; 7],
}

impl LatencyHistogram {
    pub fn record(&mut self, latency: Cycle) {
        let idx = match latency {
            0..=15 => 0,
            16..=31 => 1,
            32..=63 => 2,
            64..=127 => 3,
            128..=255 => 4,
            256..=511 => 5,
            _ => 6,
        };
        self.buckets[idx] = self.buckets[idx].saturating_add(1);
    }
}

/// What happened in one issue cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub issued: usize,
    pub hit_issue_cap: bool,
    pub hit_fence: bool,
    pub hit_reorder_limit: bool,
    pub fences_retired: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CpuStats {
    pub read: OpCounters,
    pub write: OpCounters,
    pub custom: OpCounters,
    pub latency: LatencySummary,
    pub latency_hist: LatencyHistogram,
    pub fences_retired: u64,
    pub cycles: u64,
    pub cycles_with_issue: u64,
    pub cycles_no_issue: u64,
    pub cycles_hit_fence: u64,
    pub cycles_max_reorder: u64,
    pub cycles_max_issue: u64,
    /// Cycle at which the most recent generator finished draining.
    pub time: Cycle,
    pub generators_completed: u64,
}

impl CpuStats {
    pub fn op(&self, op: ReqOperation) -> Option<&OpCounters> {
        match op {
            ReqOperation::Read => Some(&self.read),
            ReqOperation::Write => Some(&self.write),
            ReqOperation::Custom => Some(&self.custom),
            ReqOperation::Fence => None,
        }
    }

    fn op_mut(&mut self, op: ReqOperation) -> Option<&mut OpCounters> {
        match op {
            ReqOperation::Read => Some(&mut self.read),
            ReqOperation::Write => Some(&mut self.write),
            ReqOperation::Custom => Some(&mut self.custom),
            ReqOperation::Fence => None,
        }
    }

    pub fn total_reqs(&self) -> u64 {
        self.read.reqs + self.write.reqs + self.custom.reqs
    }

    pub(super) fn record_issue(&mut self, op: ReqOperation, bytes: u64, split: bool) {
        if let Some(counters) = self.op_mut(op) {
            counters.reqs = counters.reqs.saturating_add(1);
            counters.bytes = counters.bytes.saturating_add(bytes);
            if split {
                counters.split_reqs = counters.split_reqs.saturating_add(1);
            }
        }
    }

    pub(super) fn record_latency(&mut self, latency: Cycle) {
        self.latency.count = self.latency.count.saturating_add(1);
        self.latency.sum = self.latency.sum.saturating_add(latency);
        self.latency.max = self.latency.max.max(latency);
        self.latency_hist.record(latency);
    }

    pub(super) fn record_finish(&mut self, now: Cycle) {
        self.time = now;
        self.generators_completed = self.generators_completed.saturating_add(1);
    }

    pub(super) fn record_cycle(&mut self, outcome: CycleOutcome) {
        self.cycles = self.cycles.saturating_add(1);
        if outcome.issued > 0 {
            self.cycles_with_issue = self.cycles_with_issue.saturating_add(1);
        } else {
            self.cycles_no_issue = self.cycles_no_issue.saturating_add(1);
        }
        if outcome.hit_issue_cap {
            self.cycles_max_issue = self.cycles_max_issue.saturating_add(1);
        }
        if outcome.hit_fence {
            self.cycles_hit_fence = self.cycles_hit_fence.saturating_add(1);
        }
        if outcome.hit_reorder_limit {
            self.cycles_max_reorder = self.cycles_max_reorder.saturating_add(1);
        }
        self.fences_retired = self
            .fences_retired
            .saturating_add(outcome.fences_retired as u64);
    }
}
