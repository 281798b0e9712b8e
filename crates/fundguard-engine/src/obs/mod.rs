//! Observability: in-process metrics rendered in Prometheus text format.

pub mod metrics;

pub use metrics::EngineMetrics;
