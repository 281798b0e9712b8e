//! Top-level facade crate for fundguard.
//!
//! Re-exports core types and the engine library so users can depend on a single crate.

pub mod core {
    pub use fundguard_core::*;
}

pub mod engine {
    pub use fundguard_engine::*;
}
