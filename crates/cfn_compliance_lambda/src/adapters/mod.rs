pub mod bucket;
pub mod callback;
pub mod function;
pub mod key;
pub mod queue;
