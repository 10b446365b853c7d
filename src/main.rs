use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use reqgen::cpu::CpuConfig;
use reqgen::mem::MemConfig;
use reqgen::sim::config::{Config, SimConfig};
use reqgen::sim::top::Sim;
use reqgen::traffic::GeneratorConfig;
use toml::Table;

#[derive(Parser)]
#[command(version, about)]
struct ReqgenArgs {
    #[arg(help = "Path to config.toml")]
    config_path: PathBuf,
    #[arg(
        long,
        help = "Override the default generator (empty, single_stream, random, copy)"
    )]
    generator: Option<String>,
    #[arg(long, help = "Override maximum requests issued per cycle")]
    max_reqs_cycle: Option<u32>,
    #[arg(long, help = "Override reorder lookahead window")]
    max_reorder_lookups: Option<u32>,
    #[arg(long, help = "Override page mapping (LINEAR or RANDOMIZED)")]
    pagemap: Option<String>,
    #[arg(long, help = "Enable log at level (0:none, 1:info, 2:debug)")]
    log: Option<u64>,
    #[arg(long, help = "Write the stats summary as JSON")]
    stats_json: Option<PathBuf>,
}

pub fn main() -> anyhow::Result<()> {
    env_logger::init();

    let argv = ReqgenArgs::parse();
    let config = fs::read_to_string(&argv.config_path)
        .with_context(|| format!("failed to read config file {}", argv.config_path.display()))?;
    let config_table: Table = toml::from_str(&config).context("cannot parse config toml")?;

    let mut sim_config = SimConfig::from_table(&config_table, "sim")?;
    let mut cpu_config = CpuConfig::from_table(&config_table, "cpu")?;
    let gen_configs = GeneratorConfig::list_from_table(&config_table, "generator")?;
    let mem_config = MemConfig::from_table(&config_table, "mem")?;

    // override toml configs with argv
    sim_config.log_level = argv.log.unwrap_or(sim_config.log_level);
    sim_config.stats_json = argv.stats_json.or(sim_config.stats_json);
    cpu_config.generator = argv.generator.unwrap_or(cpu_config.generator);
    cpu_config.max_reqs_cycle = argv.max_reqs_cycle.unwrap_or(cpu_config.max_reqs_cycle);
    cpu_config.max_reorder_lookups = argv
        .max_reorder_lookups
        .unwrap_or(cpu_config.max_reorder_lookups);
    cpu_config.pagemap = argv.pagemap.unwrap_or(cpu_config.pagemap);

    let mut sim = Sim::with_generators(sim_config, cpu_config, gen_configs, mem_config)?;
    let summary = sim.simulate()?;
    summary.print();
    Ok(())
}
