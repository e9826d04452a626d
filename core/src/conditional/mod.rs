// payhula-flow/src/conditional/mod.rs

//! Routing one step of a main pipeline into one of several scoped pipelines.
//!
//! Each scope pairs a condition on the main context with a provider of a
//! `Pipeline<SData, Err>` and an extractor producing the `ContextData<SData>`
//! it runs on. The first scope whose condition holds is executed.

pub mod builder;
pub mod provider;
pub mod scope;

pub use builder::ConditionalScopeBuilder;
