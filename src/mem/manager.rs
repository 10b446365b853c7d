use std::str::FromStr;

use anyhow::bail;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageMapMode {
    #[default]
    Linear,
    Randomized,
}

impl FromStr for PageMapMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LINEAR" => Ok(Self::Linear),
            "RANDOMIZED" => Ok(Self::Randomized),
            _ => bail!(
                "unsupported pagemap '{}', expected one of: LINEAR, RANDOMIZED",
                value
            ),
        }
    }
}

/// Virtual-to-physical page mapper.  The address space is `page_count * page_size` bytes and
/// virtual pages beyond it wrap around.  The offset within a page is always preserved.
#[derive(Debug, Clone)]
pub struct MemoryManager {
    page_size: u64,
    page_count: u64,
    mode: PageMapMode,
    // physical page number per virtual page; empty for the linear map
    page_table: Vec<u64>,
}

impl MemoryManager {
    pub fn new(
        page_size: u64,
        page_count: u64,
        mode: PageMapMode,
        seed: u64,
    ) -> anyhow::Result<Self> {
        if page_size == 0 || page_count == 0 {
            bail!("page size and page count must be non-zero");
        }
        let page_table = match mode {
            PageMapMode::Linear => Vec::new(),
            PageMapMode::Randomized => {
                let mut table: Vec<u64> = (0..page_count).collect();
                let mut rng = StdRng::seed_from_u64(seed);
                table.shuffle(&mut rng);
                table
            }
        };
        Ok(Self {
            page_size,
            page_count,
            mode,
            page_table,
        })
    }

    pub fn map_address(&self, addr: u64) -> u64 {
        let offset = addr % self.page_size;
        let vpage = (addr / self.page_size) % self.page_count;
        let ppage = match self.mode {
            PageMapMode::Linear => vpage,
            PageMapMode::Randomized => self.page_table[vpage as usize],
        };
        ppage * self.page_size + offset
    }
}
