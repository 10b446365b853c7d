pub mod config;
pub mod log;
pub mod perf_log;
pub mod top;
