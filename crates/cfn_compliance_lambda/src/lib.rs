//! AWS-oriented adapters and handlers for the compliance custom resource.
//!
//! This crate owns runtime integration details (the Lambda handler, callback
//! delivery, and service adapters) and exposes a single runtime module
//! boundary for the custom-resource contract and transform primitives.

pub mod adapters;
pub mod handlers;
pub mod runtime;
