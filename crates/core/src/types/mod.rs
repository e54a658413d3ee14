//! Core type definitions for Enact.
//!
//! This module contains the fundamental data structures exchanged between
//! the engine, policies, validators, and audit sinks.
//!
//! Broken down into submodules for better maintainability.

pub mod audit;
pub mod decision;
pub mod intent;
pub mod request;
pub mod rule;

pub use audit::*;
pub use decision::*;
pub use intent::*;
pub use request::*;
pub use rule::*;
