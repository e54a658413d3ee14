#![deny(unused)]
//! The Enact governance engine.
//!
//! This crate provides:
//! - The validator pipeline with built-in justification and schema checks
//! - The [`GovernanceEngine`]: the ordered decision pipeline composing the
//!   kill-switch, validators, rate limiting, quotas, circuit breaking,
//!   policy evaluation, human oversight, and audit fan-out

pub mod engine;
pub mod validation;

pub use engine::{GovernanceEngine, GovernanceEngineBuilder};
pub use validation::{JustificationValidator, SchemaValidator, ValidationPipeline};
