use anyhow::Context;
use serde::Deserialize;
use toml::{Table, Value};

use crate::sim::config::Config;

/// Parameters shared by the built-in generators.  Each generator reads the subset it needs.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Generator to load; falls back to the core's `generator` key.
    pub kind: Option<String>,
    /// Total logical memory requests to produce (fences not counted).
    pub count: u64,
    /// Most requests appended per `generate` call.
    pub batch: u32,
    pub start_address: u64,
    pub length: u64,
    pub stride: u64,
    /// `read`, `write` or `custom`.
    pub op: String,
    pub opcode: u32,
    pub max_address: u64,
    pub read_fraction: f64,
    pub seed: u64,
    pub dst_address: u64,
    /// Emit a fence after this many copy pairs; zero disables fences.
    pub fence_every: u64,
}

impl Config for GeneratorConfig {}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: None,
            count: 1024,
            batch: 16,
            start_address: 0,
            length: 8,
            stride: 8,
            op: "read".to_string(),
            opcode: 0,
            max_address: 1 << 20,
            read_fraction: 0.5,
            seed: 0,
            dst_address: 1 << 20,
            fence_every: 0,
        }
    }
}

impl GeneratorConfig {
    /// Reads either a single `[generator]` table or a `[[generator]]` array, in load order.
    pub fn list_from_table(table: &Table, section: &str) -> anyhow::Result<Vec<Self>> {
        match table.get(section) {
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| {
                    Self::from_section(Some(entry))
                        .with_context(|| format!("invalid [[{}]] entry {}", section, idx))
                })
                .collect(),
            _ => Ok(vec![Self::from_table(table, section)?]),
        }
    }
}
