//! fundguard core: identifiers, asset-flow descriptions, collaborator
//! contracts, the audit log surface and the shared error type.
//!
//! This crate carries no runtime state of its own. The engine crate builds on
//! these types, and external collaborators (adapters, asset registries, audit
//! sinks) only need to depend on this crate.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `FundError`/`Result` so a malformed request never takes the
//! process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod address;
pub mod audit;
pub mod error;
pub mod flow;
pub mod registry;

pub use address::Address;
pub use audit::{AuditEvent, AuditLog, MemoryAuditLog, TracingAuditLog};
pub use error::{ErrorCode, FundError};
/// Shared result type.
pub use error::Result;
pub use flow::{AssetAmount, AssetFlowDescriptor, AssetFlows, PolicyHook};
pub use registry::{AssetRegistry, StaticAssetRegistry};
