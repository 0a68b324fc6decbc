pub mod health;
pub mod latency;
pub mod routes;

pub use health::PipelineHealth;
pub use latency::RunLatency;
