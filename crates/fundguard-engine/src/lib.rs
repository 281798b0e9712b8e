//! fundguard engine library entry.
//!
//! This crate wires the policy layer, the fund lifecycle and migration flow,
//! adapters, fee settlement and metrics into one engine. It is consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod clock;
pub mod config;
pub mod engine;
pub mod fees;
pub mod integration;
pub mod lifecycle;
pub mod obs;
pub mod policy;
