//! Domain logic for the safe action governance engine.
//!
//! Everything in this crate is independent of the database and HTTP layers:
//! the lifecycle state machine, the action catalog, policy evaluator
//! contracts, the execution throttle, executor routing, the audit summary
//! projection, and telemetry counters.

pub mod audit;
pub mod catalog;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod metric_names;
pub mod policy;
pub mod telemetry;
pub mod throttle;
pub mod types;
