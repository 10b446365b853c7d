pub mod config;
pub mod patterns;

use crate::cpu::queue::RequestQueue;
use crate::cpu::request::{Request, RequestIdGen};

pub use config::GeneratorConfig;
pub use patterns::{build_generator, CopyGenerator, EmptyGenerator, RandomGenerator, SingleStreamGenerator};

/// Source of memory requests for one core.
pub trait RequestGenerator {
    /// Append zero or more requests.  Ids must come from `ids`.
    fn generate(&mut self, queue: &mut RequestQueue<Request>, ids: &mut RequestIdGen);

    fn is_finished(&self) -> bool;

    /// Called once when the core has drained everything this generator produced.
    fn completed(&mut self) {}

    fn name(&self) -> &str;
}
