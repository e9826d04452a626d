// payhula-flow/src/core/context.rs

//! Boxed handler types stored by a `Pipeline<TData, Err>`.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A step handler.
///
/// Receives a clone of the shared `ContextData<TData>` and resolves to a
/// `PipelineControl` or the pipeline's error type.
///
/// Handlers must drop every lock guard obtained from the context before
/// reaching an `.await` point.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// A compensation handler, run while unwinding a failed pipeline.
///
/// It is armed before its step executes, so it must read the context to find
/// out what the step actually did and undo only that.
pub type Compensation<TData, Err> =
  Box<dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<(), Err>> + Send>> + Send + Sync>;
