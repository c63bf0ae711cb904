//! The safe action orchestrator: composition root for the lifecycle
//! gates, executor routing, and audit persistence.

pub mod orchestrator;

pub use orchestrator::{ProposeAction, SafeActionEngine};
