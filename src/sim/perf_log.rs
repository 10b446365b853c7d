use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::cpu::CpuStats;
use crate::mem::backend::MemStats;
use crate::timeq::Cycle;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Generators in the order they ran.
    pub generators: Vec<String>,
    pub cycles: Cycle,
    pub cpu: CpuStats,
    pub mem: MemStats,
}

impl RunSummary {
    pub fn print(&self) {
        let cpu = &self.cpu;
        println!(
            "[STATS] generators {} finished at cycle {} ({} completed)",
            self.generators.join(" -> "),
            cpu.time,
            cpu.generators_completed
        );
        for (name, ops) in [("read", &cpu.read), ("write", &cpu.write), ("custom", &cpu.custom)] {
            println!(
                "[STATS] {:<6} reqs={:>10} bytes={:>12} split={:>8}",
                name, ops.reqs, ops.bytes, ops.split_reqs
            );
        }
        println!(
            "[STATS] cycles={} with_issue={} no_issue={} max_issue={} hit_fence={} max_reorder={}",
            cpu.cycles,
            cpu.cycles_with_issue,
            cpu.cycles_no_issue,
            cpu.cycles_max_issue,
            cpu.cycles_hit_fence,
            cpu.cycles_max_reorder
        );
        match cpu.latency.mean() {
            Some(mean) => println!(
                "[STATS] latency mean={:.2} max={} count={}",
                mean, cpu.latency.max, cpu.latency.count
            ),
            None => println!("[STATS] latency n/a"),
        }
    }
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
