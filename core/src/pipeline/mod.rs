// payhula-flow/src/pipeline/mod.rs

//! The `Pipeline` type: definition, handler/compensation registration and execution.

pub mod definition;
pub mod execution;
pub mod hooks;

pub use definition::Pipeline;
