//! Login schedule evaluation for vigie
//!
//! This crate turns a user's weekly login schedule into a decision:
//! - [`PolicyEvaluator`]: pure evaluation of a canonical schedule at an instant
//! - [`ExplainService`]: the same pipeline, reporting why (operator tooling)
//! - [`LoginGate`]: the single entry point for the login and session-check
//!   paths, with logging and audit records

mod evaluator;
mod explain;
mod gate;

pub use evaluator::*;
pub use explain::*;
pub use gate::*;
