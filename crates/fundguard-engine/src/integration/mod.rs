//! Integration adapters: external collaborators that describe the asset
//! flows of a trade. The engine only consumes the four parallel sequences.

pub mod adapters;

pub use adapters::{AdapterRegistry, IntegrationAdapter};
