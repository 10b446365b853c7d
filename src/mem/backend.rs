use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::mem::interface::{MemRequest, MemoryInterface, SubRequestId};
use crate::sim::config::Config;
use crate::timeq::{Cycle, LatencyQueue};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemConfig {
    pub base_latency: Cycle,
    /// Upper bound (inclusive) of the extra cycles drawn per request.
    pub latency_jitter: Cycle,
    pub seed: u64,
}

impl Config for MemConfig {}

impl Default for MemConfig {
    fn default() -> Self {
        Self {
            base_latency: 20,
            latency_jitter: 0,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MemCompletion {
    pub id: SubRequestId,
    pub request: MemRequest,
    pub issued_at: Cycle,
    pub ready_at: Cycle,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MemStats {
    pub issued: u64,
    pub completed: u64,
    pub bytes_issued: u64,
    pub max_inflight: u64,
}

/// Memory model with a fixed base latency plus seeded random jitter.  With jitter enabled,
/// completions come back out of issue order.
pub struct LatencyMemory {
    config: MemConfig,
    rng: StdRng,
    next_id: SubRequestId,
    inflight: LatencyQueue<(SubRequestId, MemRequest)>,
    stats: MemStats,
}

impl LatencyMemory {
    pub fn new(config: MemConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            next_id: 0,
            inflight: LatencyQueue::new(),
            stats: MemStats::default(),
        }
    }

    /// Removes and returns everything that finished by `now`.
    pub fn drain_completed(&mut self, now: Cycle) -> Vec<MemCompletion> {
        let mut done = Vec::new();
        self.inflight.service_ready(now, |(id, request), ticket| {
            done.push(MemCompletion {
                id,
                request,
                issued_at: ticket.issued_at(),
                ready_at: ticket.ready_at(),
            });
        });
        self.stats.completed = self.stats.completed.saturating_add(done.len() as u64);
        done
    }

    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    pub fn stats(&self) -> MemStats {
        self.stats
    }

    fn sample_latency(&mut self) -> Cycle {
        let jitter = if self.config.latency_jitter == 0 {
            0
        } else {
            self.rng.gen_range(0..=self.config.latency_jitter)
        };
        self.config.base_latency.saturating_add(jitter)
    }
}

impl MemoryInterface for LatencyMemory {
    fn issue(&mut self, now: Cycle, request: MemRequest) -> SubRequestId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let latency = self.sample_latency();
        let _ = self.inflight.push(now, latency, (id, request));
        self.stats.issued = self.stats.issued.saturating_add(1);
        self.stats.bytes_issued = self.stats.bytes_issued.saturating_add(request.size);
        self.stats.max_inflight = self.stats.max_inflight.max(self.inflight.len() as u64);
        id
    }
}
