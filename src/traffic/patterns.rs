use std::str::FromStr;

use anyhow::bail;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cpu::queue::RequestQueue;
use crate::cpu::request::{Request, RequestIdGen};
use crate::traffic::config::GeneratorConfig;
use crate::traffic::RequestGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternOp {
    Read,
    Write,
    Custom(u32),
}

impl PatternOp {
    fn parse(value: &str, opcode: u32) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "read" | "r" => Ok(Self::Read),
            "write" | "w" => Ok(Self::Write),
            "custom" | "c" => Ok(Self::Custom(opcode)),
            _ => bail!(
                "unsupported generator op '{}', expected one of: read, write, custom",
                value
            ),
        }
    }

    fn build(self, ids: &mut RequestIdGen, addr: u64, length: u64) -> Request {
        match self {
            Self::Read => Request::read(ids, addr, length),
            Self::Write => Request::write(ids, addr, length),
            Self::Custom(opcode) => Request::custom(ids, addr, length, opcode),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    Empty,
    SingleStream,
    Random,
    Copy,
}

impl FromStr for GeneratorKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "empty" | "null" => Ok(Self::Empty),
            "single_stream" | "stream" => Ok(Self::SingleStream),
            "random" => Ok(Self::Random),
            "copy" => Ok(Self::Copy),
            _ => bail!(
                "unknown generator '{}', expected one of: empty, single_stream, random, copy",
                value
            ),
        }
    }
}

/// Loads the generator named by the core's `generator` key.
pub fn build_generator(
    name: &str,
    config: &GeneratorConfig,
) -> anyhow::Result<Box<dyn RequestGenerator>> {
    let generator: Box<dyn RequestGenerator> = match name.parse::<GeneratorKind>()? {
        GeneratorKind::Empty => Box::new(EmptyGenerator),
        GeneratorKind::SingleStream => Box::new(SingleStreamGenerator::new(config)?),
        GeneratorKind::Random => Box::new(RandomGenerator::new(config)?),
        GeneratorKind::Copy => Box::new(CopyGenerator::new(config)?),
    };
    Ok(generator)
}

fn check_length(config: &GeneratorConfig) -> anyhow::Result<()> {
    if config.length == 0 {
        bail!("generator length must be non-zero");
    }
    Ok(())
}

/// Produces nothing and is finished from the start.
#[derive(Debug, Default)]
pub struct EmptyGenerator;

impl RequestGenerator for EmptyGenerator {
    fn generate(&mut self, _queue: &mut RequestQueue<Request>, _ids: &mut RequestIdGen) {}

    fn is_finished(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "empty"
    }
}

/// Sequential addresses `start + i * stride`, all of one operation kind.
#[derive(Debug)]
pub struct SingleStreamGenerator {
    op: PatternOp,
    next_addr: u64,
    stride: u64,
    length: u64,
    remaining: u64,
    batch: u32,
}

impl SingleStreamGenerator {
    pub fn new(config: &GeneratorConfig) -> anyhow::Result<Self> {
        check_length(config)?;
        Ok(Self {
            op: PatternOp::parse(&config.op, config.opcode)?,
            next_addr: config.start_address,
            stride: config.stride,
            length: config.length,
            remaining: config.count,
            batch: config.batch.max(1),
        })
    }
}

impl RequestGenerator for SingleStreamGenerator {
    fn generate(&mut self, queue: &mut RequestQueue<Request>, ids: &mut RequestIdGen) {
        let n = self.remaining.min(self.batch as u64);
        for _ in 0..n {
            queue.push_back(self.op.build(ids, self.next_addr, self.length));
            self.next_addr = self.next_addr.wrapping_add(self.stride);
        }
        self.remaining -= n;
    }

    fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    fn completed(&mut self) {
        info!("single_stream generator drained");
    }

    fn name(&self) -> &str {
        "single_stream"
    }
}

/// Uniform random `length`-aligned addresses below `max_address`, reads with probability
/// `read_fraction` and writes otherwise.
#[derive(Debug)]
pub struct RandomGenerator {
    rng: StdRng,
    slots: u64,
    length: u64,
    read_fraction: f64,
    remaining: u64,
    batch: u32,
}

impl RandomGenerator {
    pub fn new(config: &GeneratorConfig) -> anyhow::Result<Self> {
        check_length(config)?;
        let slots = config.max_address / config.length;
        if slots == 0 {
            bail!(
                "random generator max_address ({}) is smaller than length ({})",
                config.max_address,
                config.length
            );
        }
        if !(0.0..=1.0).contains(&config.read_fraction) {
            bail!("read_fraction must be within [0, 1]");
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            slots,
            length: config.length,
            read_fraction: config.read_fraction,
            remaining: config.count,
            batch: config.batch.max(1),
        })
    }
}

impl RequestGenerator for RandomGenerator {
    fn generate(&mut self, queue: &mut RequestQueue<Request>, ids: &mut RequestIdGen) {
        let n = self.remaining.min(self.batch as u64);
        for _ in 0..n {
            let addr = self.rng.gen_range(0..self.slots) * self.length;
            let req = if self.rng.gen_bool(self.read_fraction) {
                Request::read(ids, addr, self.length)
            } else {
                Request::write(ids, addr, self.length)
            };
            queue.push_back(req);
        }
        self.remaining -= n;
    }

    fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    fn completed(&mut self) {
        info!("random generator drained");
    }

    fn name(&self) -> &str {
        "random"
    }
}

/// Copies `count` elements of `length` bytes from `start_address` to `dst_address`.  Every
/// write depends on the read of the same element; `fence_every` pairs are followed by a fence.
#[derive(Debug)]
pub struct CopyGenerator {
    src: u64,
    dst: u64,
    length: u64,
    pairs: u64,
    next_pair: u64,
    fence_every: u64,
    batch: u32,
}

impl CopyGenerator {
    pub fn new(config: &GeneratorConfig) -> anyhow::Result<Self> {
        check_length(config)?;
        Ok(Self {
            src: config.start_address,
            dst: config.dst_address,
            length: config.length,
            pairs: config.count,
            next_pair: 0,
            fence_every: config.fence_every,
            batch: config.batch.max(2),
        })
    }
}

impl RequestGenerator for CopyGenerator {
    fn generate(&mut self, queue: &mut RequestQueue<Request>, ids: &mut RequestIdGen) {
        let mut budget = self.batch;
        while budget >= 2 && self.next_pair < self.pairs {
            let offset = self.next_pair * self.length;
            let read = Request::read(ids, self.src + offset, self.length);
            let mut write = Request::write(ids, self.dst + offset, self.length);
            write.add_dependency(read.id());
            queue.push_back(read);
            queue.push_back(write);
            budget -= 2;
            self.next_pair += 1;

            if self.fence_every > 0 && self.next_pair % self.fence_every == 0 {
                queue.push_back(Request::fence(ids));
                budget = budget.saturating_sub(1);
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.next_pair >= self.pairs
    }

    fn completed(&mut self) {
        info!("copy generator drained after {} pairs", self.pairs);
    }

    fn name(&self) -> &str {
        "copy"
    }
}
