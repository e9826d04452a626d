// payhula-flow/src/lib.rs

//! payhula-flow: async, type-safe step pipelines with compensation.
//!
//! A pipeline is an ordered list of named steps executed against a shared,
//! lockable context. It supports:
//!  - before/on/after handlers per step.
//!  - `Continue`/`Stop` flow control from any handler.
//!  - Skip conditions and optional (best-effort) steps.
//!  - Compensation handlers armed before a step runs and unwound in reverse
//!    order when a later mandatory step fails (saga semantics).
//!  - Conditional scoped sub-pipelines, used to route one context into one of
//!    several specialised pipelines.
//!  - A type-keyed registry for running the pipeline registered for a context type.

pub mod conditional;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::{Compensation, Handler};
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::conditional::builder::{ConditionalScopeBuilder, ConditionalScopeConfigurator};
pub use crate::conditional::provider::{FunctionalPipelineProvider, PipelineProvider, StaticPipelineProvider};

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;

/*
    Typical usage:
    1. Define a data struct `OrderData` for one workflow.
    2. Create a `Pipeline<OrderData, AppError>` listing its steps.
    3. Attach handlers with `.on_root()` (and `.before_root()`/`.after_root()`).
    4. For each step that creates something a later failure must undo, attach
       a `.compensate_root()` handler. It is armed before the step runs.
    5. To branch into specialised pipelines, use
       `pipeline.conditional_scopes_for_step("route")` and chain
       `.add_static_scope(...)` / `.on_condition(...)`, then
       `.finalize_conditional_step(...)`.
    6. Register the pipeline in a `FlowRegistry<AppError>` and call
       `registry.run(ContextData::new(data)).await`.
*/
