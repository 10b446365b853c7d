use anyhow::bail;
use serde::Deserialize;

use crate::sim::config::Config;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CpuConfig {
    /// Requests issued per cycle, across all operation kinds.
    pub max_reqs_cycle: u32,
    /// Queue positions scanned per cycle looking for an issuable request.
    pub max_reorder_lookups: u32,
    pub cache_line_size: u64,
    /// Outstanding logical requests allowed per operation kind.
    pub maxmemreqpending: u32,
    pub verbose: u64,
    pub generator: String,
    pub pagecount: u64,
    /// Must be a multiple of `cache_line_size`.
    pub pagesize: u64,
    /// `LINEAR` or `RANDOMIZED`.
    pub pagemap: String,
    pub pagemap_seed: u64,
}

impl Config for CpuConfig {}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            max_reqs_cycle: 2,
            max_reorder_lookups: 16,
            cache_line_size: 64,
            maxmemreqpending: 16,
            verbose: 0,
            generator: "single_stream".to_string(),
            pagecount: 4_194_304,
            pagesize: 4096,
            pagemap: "LINEAR".to_string(),
            pagemap_seed: 1,
        }
    }
}

impl CpuConfig {
    /// Checks the limits the issue engine depends on.  Page-map and generator names are checked
    /// by the components that parse them.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_reqs_cycle == 0 {
            bail!("max_reqs_cycle must be at least 1");
        }
        if self.max_reorder_lookups == 0 {
            bail!("max_reorder_lookups must be at least 1");
        }
        if self.maxmemreqpending == 0 {
            bail!("maxmemreqpending must be at least 1");
        }
        if self.cache_line_size == 0 {
            bail!("cache_line_size must be non-zero");
        }
        if self.pagecount == 0 {
            bail!("pagecount must be non-zero");
        }
        if self.pagesize == 0 || self.pagesize % self.cache_line_size != 0 {
            bail!(
                "pagesize ({}) must be a non-zero multiple of cache_line_size ({})",
                self.pagesize,
                self.cache_line_size
            );
        }
        Ok(())
    }
}
