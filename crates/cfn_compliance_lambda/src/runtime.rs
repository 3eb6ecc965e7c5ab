//! Single module boundary for domain primitives consumed by runtime code.

pub use cfn_compliance_core::{contract, principals, tag_lists};
