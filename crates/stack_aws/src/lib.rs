//! AWS-oriented adapters and workflow drivers for the demo stack.
//!
//! This crate owns integration details: one adapter trait per consumed AWS
//! service with an SDK-backed implementation, the provision and teardown
//! workflows, and the structured event sink. Deterministic naming, policy,
//! plan, and manifest primitives live in `stack_core`.

pub mod adapters;
pub mod events;
pub mod handlers;
