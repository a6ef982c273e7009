//! Network traffic: per-interface and per-application byte and packet deltas.
//!
//! [`TrafficSampler`] reads the platform counters on a fixed period and
//! [`TrafficProcessor`] turns consecutive snapshots into deltas.

mod processor;
mod sampler;

pub use processor::TrafficProcessor;
pub use sampler::{CounterSource, TrafficSampler, DEFAULT_SAMPLE_INTERVAL};
