use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::bail;
use log::info;

use crate::cpu::{CpuConfig, IssueEngine};
use crate::mem::{LatencyMemory, MemConfig};
use crate::sim::config::SimConfig;
use crate::sim::log::Logger;
use crate::sim::perf_log::{self, RunSummary};
use crate::timeq::Cycle;
use crate::traffic::{build_generator, GeneratorConfig, RequestGenerator};

/// Host loop: one generator-driven core attached to a latency memory model.  Generators run
/// one after another; the next is loaded once the previous one has drained.
pub struct Sim {
    config: SimConfig,
    generator_names: Vec<String>,
    engine: IssueEngine<LatencyMemory>,
    next_generators: VecDeque<Box<dyn RequestGenerator>>,
}

impl Sim {
    pub fn new(
        sim_config: SimConfig,
        cpu_config: CpuConfig,
        gen_config: GeneratorConfig,
        mem_config: MemConfig,
    ) -> anyhow::Result<Self> {
        Self::with_generators(sim_config, cpu_config, vec![gen_config], mem_config)
    }

    /// Builds every generator up front so a bad entry fails before the run starts.  Entries
    /// without a `kind` use the core's `generator` key.
    pub fn with_generators(
        sim_config: SimConfig,
        cpu_config: CpuConfig,
        gen_configs: Vec<GeneratorConfig>,
        mem_config: MemConfig,
    ) -> anyhow::Result<Self> {
        let mut generators = gen_configs
            .iter()
            .map(|gen| {
                let kind = gen.kind.as_deref().unwrap_or(&cpu_config.generator);
                build_generator(kind, gen)
            })
            .collect::<anyhow::Result<VecDeque<_>>>()?;
        let generator_names = generators.iter().map(|g| g.name().to_string()).collect();
        let Some(first) = generators.pop_front() else {
            bail!("no generator configured");
        };

        let logger = Arc::new(Logger::new(
            "cpu",
            sim_config.log_level.max(cpu_config.verbose),
        ));
        let engine = IssueEngine::new(
            &cpu_config,
            first,
            LatencyMemory::new(mem_config),
            logger,
        )?;
        Ok(Self {
            config: sim_config,
            generator_names,
            engine,
            next_generators: generators,
        })
    }

    /// Runs until the engine reports done.  Completions due on a cycle are delivered before
    /// that cycle's tick.
    pub fn simulate(&mut self) -> anyhow::Result<RunSummary> {
        let mut now: Cycle = 0;
        loop {
            for completion in self.engine.mem_mut().drain_completed(now) {
                let _ = self.engine.handle_completion(completion.id, now);
            }
            if self.engine.tick(now) {
                match self.next_generators.pop_front() {
                    Some(next) => self.engine.load_generator(next)?,
                    None => break,
                }
            }
            now += 1;
            if now >= self.config.timeout {
                bail!(
                    "simulation timed out after {} cycles ({} pending, {} in flight)",
                    now,
                    self.engine.pending().size(),
                    self.engine.inflight_requests()
                );
            }
        }

        let summary = RunSummary {
            generators: self.generator_names.clone(),
            cycles: now,
            cpu: *self.engine.stats(),
            mem: self.engine.mem().stats(),
        };
        if let Some(path) = self.config.stats_json.as_ref() {
            perf_log::write_summary(path, &summary)?;
            info!("wrote stats to {}", path.display());
        }
        Ok(summary)
    }
}
