//! Shared custom-resource domain primitives.
//!
//! This crate owns the CloudFormation custom-resource contracts and the pure
//! string transforms behind the compliance actions. It intentionally excludes
//! AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod principals;
pub mod tag_lists;
