pub mod callback;
pub mod create;
